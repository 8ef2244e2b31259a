use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};

use yonku::gate::{self, BAUD_RATE_OPTIONS, GateCommand, GateLink, SerialGateLink};
use yonku::ranking::compute_standings;
use yonku::settings::{FileBackedStore, SettingsStore};
use yonku::YonkuError;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports a start gate could be connected to
    Ports,
    /// Show registered players, vehicles, and course assignments
    Roster,
    /// Show the saved race history
    History,
    /// Show the overall standings computed from the race history
    Standings,
    /// Talk to the start gate over a serial port
    Gate {
        /// Serial port name, e.g. /dev/ttyUSB0 or COM3
        #[arg(short, long)]
        port: String,

        #[arg(short, long, default_value_t = BAUD_RATE_OPTIONS[0])]
        baud: u32,

        /// Command to send to the gate
        #[arg(short, long)]
        command: Option<GateCommandArg>,

        /// Keep the connection open and print gate status lines
        #[arg(short, long)]
        listen: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GateCommandArg {
    Start,
    Prepare,
    Auto,
}

impl From<GateCommandArg> for GateCommand {
    fn from(value: GateCommandArg) -> Self {
        match value {
            GateCommandArg::Start => GateCommand::Start,
            GateCommandArg::Prepare => GateCommand::Prepare,
            GateCommandArg::Auto => GateCommand::AutoMode,
        }
    }
}

fn roster() -> Result<(), YonkuError> {
    let store = FileBackedStore::new_default()?;
    let settings = store.load();

    println!("Players ({}):", settings.players.len());
    for player in &settings.players {
        let vehicle = player
            .vehicle
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("-");
        match &player.team_name {
            Some(team) => println!("  {} [{}] vehicle: {}", player.name, team, vehicle),
            None => println!("  {} vehicle: {}", player.name, vehicle),
        }
    }

    println!("Courses:");
    for course in &settings.courses {
        let player = course
            .player_id
            .as_deref()
            .and_then(|id| settings.player(id))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        println!("  course {}: {}", course.id, player);
    }
    println!("Lap count: {}", settings.lap_count);
    Ok(())
}

fn history() -> Result<(), YonkuError> {
    let store = FileBackedStore::new_default()?;
    let settings = store.load();

    for race in &settings.races {
        println!("#{} {} ({})", race.race_number, race.name, race.date);
        for result in &race.results {
            let best = result
                .best_lap
                .as_ref()
                .map(|l| l.time.as_str())
                .unwrap_or("-");
            println!(
                "  {}. {} laps: {} total: {} best: {}",
                result.position,
                result.player_name,
                result.laps.len(),
                result.total_time,
                best
            );
        }
    }
    println!("{} races recorded", settings.races.len());
    Ok(())
}

fn standings() -> Result<(), YonkuError> {
    let store = FileBackedStore::new_default()?;
    let settings = store.load();

    for standing in compute_standings(&settings.races) {
        println!(
            "{}. {} wins: {} races: {} best: {}",
            standing.position,
            standing.player_name,
            standing.wins,
            standing.races,
            standing.best_time.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn run_gate(
    port: &str,
    baud: u32,
    command: Option<GateCommandArg>,
    listen: bool,
) -> Result<(), YonkuError> {
    if !BAUD_RATE_OPTIONS.contains(&baud) {
        warn!("Unusual baud rate {baud}, the gate firmware expects one of {BAUD_RATE_OPTIONS:?}");
    }

    let mut link = SerialGateLink::new();
    let lines = link.connect(port, baud)?;
    info!("Connected to {port} at {baud} baud");

    if let Some(command) = command {
        link.send(command.into())?;
        info!("Sent {command:?} to the gate");
    }

    if listen {
        loop {
            match lines.recv_timeout(Duration::from_millis(500)) {
                Ok(line) => println!("{line}"),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    link.disconnect()
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let outcome = match &cli.command {
        Commands::Ports => {
            for port in gate::list_ports() {
                println!("{port}");
            }
            Ok(())
        }
        Commands::Roster => roster(),
        Commands::History => history(),
        Commands::Standings => standings(),
        Commands::Gate {
            port,
            baud,
            command,
            listen,
        } => run_gate(port, *baud, *command, *listen),
    };

    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}
