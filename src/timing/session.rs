// Race session: one shared stopwatch driving four independent lane
// ledgers. All mutation happens on the UI thread; the periodic render
// timer calls `tick()` to re-sample elapsed time.

use log::warn;

use crate::YonkuError;
use crate::gate::{GateCommand, GateLink};
use crate::timing::{Clock, LaneLedger};

/// Number of lanes driven by one session, one per course.
pub const LANE_COUNT: usize = crate::settings::COURSE_COUNT;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StopwatchState {
    Stopped,
    Running,
}

pub struct RaceSession {
    clock: Box<dyn Clock>,
    gate: Option<Box<dyn GateLink>>,
    state: StopwatchState,
    /// Synthetic start instant: `elapsed = now - start_ms` while running.
    start_ms: u64,
    elapsed_ms: u64,
    lanes: [LaneLedger; LANE_COUNT],
    total_laps: u32,
}

impl RaceSession {
    pub fn new(clock: Box<dyn Clock>, total_laps: u32) -> Self {
        Self {
            clock,
            gate: None,
            state: StopwatchState::Stopped,
            start_ms: 0,
            elapsed_ms: 0,
            lanes: Default::default(),
            total_laps,
        }
    }

    /// Attach the start gate hardware. The session only ever signals it
    /// best-effort on race start.
    pub fn with_gate(mut self, gate: Box<dyn GateLink>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn state(&self) -> StopwatchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == StopwatchState::Running
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn set_total_laps(&mut self, total_laps: u32) {
        self.total_laps = total_laps;
    }

    /// Last sampled elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn lanes(&self) -> &[LaneLedger; LANE_COUNT] {
        &self.lanes
    }

    pub fn lane(&self, lane_id: u8) -> Result<&LaneLedger, YonkuError> {
        self.lanes
            .get(Self::lane_index(lane_id)?)
            .ok_or(YonkuError::InvalidLane { lane_id })
    }

    fn lane_index(lane_id: u8) -> Result<usize, YonkuError> {
        if (1..=LANE_COUNT as u8).contains(&lane_id) {
            Ok(lane_id as usize - 1)
        } else {
            Err(YonkuError::InvalidLane { lane_id })
        }
    }

    /// Start (or resume) the stopwatch. Elapsed time continues from its
    /// last paused value. Signals the gate to drop; a gate failure is a
    /// notification concern, not a timing one.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.start_ms = self.clock.now_ms().saturating_sub(self.elapsed_ms);
        self.state = StopwatchState::Running;

        if let Some(gate) = self.gate.as_mut() {
            if let Err(e) = gate.send(GateCommand::Start) {
                warn!("Could not signal the start gate: {e}");
            }
        }
    }

    /// Stop the stopwatch, freezing elapsed time at its current value.
    pub fn pause(&mut self) {
        self.tick();
        self.state = StopwatchState::Stopped;
    }

    /// Stop the stopwatch and clear every lane. Roster and course
    /// assignments are untouched.
    pub fn reset(&mut self) {
        self.state = StopwatchState::Stopped;
        self.start_ms = 0;
        self.elapsed_ms = 0;
        for lane in self.lanes.iter_mut() {
            lane.reset();
        }
    }

    /// Re-sample elapsed time from the clock. Called by the periodic UI
    /// timer and before every lap mutation.
    pub fn tick(&mut self) -> u64 {
        if self.is_running() {
            self.elapsed_ms = self.clock.now_ms().saturating_sub(self.start_ms);
        }
        self.elapsed_ms
    }

    /// Record a lap crossing on `lane_id`. A lane at the lap cap ignores
    /// the crossing. Returns whether a lap was recorded.
    pub fn increment_lap(&mut self, lane_id: u8) -> Result<bool, YonkuError> {
        let index = Self::lane_index(lane_id)?;
        let elapsed = self.tick();
        let total_laps = self.total_laps;
        Ok(self.lanes[index].record_lap(elapsed, total_laps))
    }

    /// Undo the last lap on `lane_id` (miscount correction). A lane at
    /// zero laps ignores the call. Returns whether a lap was removed.
    pub fn decrement_lap(&mut self, lane_id: u8) -> Result<bool, YonkuError> {
        let index = Self::lane_index(lane_id)?;
        Ok(self.lanes[index].undo_lap())
    }
}
