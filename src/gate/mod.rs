// Serial link to the physical start/finish gate. The protocol is
// newline-delimited ASCII at 8-N-1: outbound single-character command
// codes, inbound free-form status lines surfaced verbatim.

use std::{
    io::{self, Read, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, warn};
use serialport::SerialPort;

use crate::YonkuError;

/// Baud rates offered in the connection dialog.
pub const BAUD_RATE_OPTIONS: [u32; 5] = [9_600, 19_200, 38_400, 57_600, 115_200];

const READ_TIMEOUT_MS: u64 = 100;

/// Command codes understood by the gate firmware. Writes are
/// fire-and-forget; the gate never acknowledges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateCommand {
    /// Drop the start gate.
    Start,
    /// Arm the gate for the next heat.
    Prepare,
    /// Let the gate cycle on its own timer.
    AutoMode,
}

impl GateCommand {
    pub fn code(&self) -> u8 {
        match self {
            Self::Start => b'w',
            Self::Prepare => b'q',
            Self::AutoMode => b'e',
        }
    }
}

/// Seam between the race session and the gate hardware, so the session
/// can be exercised without a serial port on the bench.
pub trait GateLink {
    fn is_connected(&self) -> bool;
    fn send(&mut self, command: GateCommand) -> Result<(), YonkuError>;
}

/// List the serial port names available on this machine. Enumeration
/// failure is logged and reported as no ports.
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            error!("Failed to list serial ports: {e}");
            Vec::new()
        }
    }
}

/// Gate link over a real serial port. A reader thread splits the inbound
/// byte stream on `\n` and forwards trimmed lines over a channel until
/// disconnect (or until the receiver is dropped).
pub struct SerialGateLink {
    port: Option<Box<dyn SerialPort>>,
    reader: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl SerialGateLink {
    pub fn new() -> Self {
        Self {
            port: None,
            reader: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open `path` at `baud_rate` (8-N-1) and start the reader thread.
    /// An already-open port is disconnected first. Returns the channel of
    /// inbound status lines.
    pub fn connect(&mut self, path: &str, baud_rate: u32) -> Result<Receiver<String>, YonkuError> {
        if self.port.is_some() {
            self.disconnect()?;
        }

        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|e| YonkuError::GatePortError { source: e })?;

        let reader_port = port
            .try_clone()
            .map_err(|e| YonkuError::GatePortError { source: e })?;

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let shutdown = Arc::new(AtomicBool::new(false));
        self.shutdown = shutdown.clone();
        self.reader = Some(thread::spawn(move || {
            read_lines(reader_port, line_tx, shutdown);
        }));
        self.port = Some(port);

        debug!("Connected to start gate on {path} at {baud_rate} baud");
        Ok(line_rx)
    }

    /// Close the port and join the reader thread.
    pub fn disconnect(&mut self) -> Result<(), YonkuError> {
        self.shutdown.store(true, Ordering::Relaxed);
        self.port = None;
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("Gate reader thread panicked during disconnect");
            }
        }
        Ok(())
    }
}

impl Default for SerialGateLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SerialGateLink {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

impl GateLink for SerialGateLink {
    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, command: GateCommand) -> Result<(), YonkuError> {
        let port = self.port.as_mut().ok_or(YonkuError::GateNotConnected)?;
        port.write_all(&[command.code()])
            .map_err(|e| YonkuError::GateIOError { source: e })
    }
}

fn read_lines(mut port: Box<dyn SerialPort>, line_tx: Sender<String>, shutdown: Arc<AtomicBool>) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 256];

    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=newline).collect();
                    let message = String::from_utf8_lossy(&line).trim().to_string();
                    if line_tx.send(message).is_err() {
                        // nobody is listening anymore
                        return;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Start gate read error: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes_match_firmware() {
        assert_eq!(GateCommand::Start.code(), b'w');
        assert_eq!(GateCommand::Prepare.code(), b'q');
        assert_eq!(GateCommand::AutoMode.code(), b'e');
    }

    #[test]
    fn test_send_without_connection_fails() {
        let mut gate = SerialGateLink::new();
        assert!(!gate.is_connected());
        assert!(matches!(
            gate.send(GateCommand::Prepare),
            Err(YonkuError::GateNotConnected)
        ));
    }

    #[test]
    fn test_disconnect_without_connection_is_a_no_op() {
        let mut gate = SerialGateLink::new();
        assert!(gate.disconnect().is_ok());
    }
}
