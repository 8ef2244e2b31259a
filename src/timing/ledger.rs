// Per-lane lap ledger: lap count, lap deltas, best lap, finish time.
// Pure state transitions driven by the session's sampled elapsed time.

use crate::settings::RaceLap;
use crate::timing::format_race_time;

/// Record of one lane's laps for the race in progress. Laps are
/// append/pop only; there is no arbitrary edit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaneLedger {
    laps: Vec<RaceLap>,
    best_lap: Option<RaceLap>,
    finish_time_ms: Option<u64>,
    /// Elapsed time at the last recorded lap boundary; the next lap's
    /// delta is measured from here.
    lap_boundary_ms: u64,
}

impl LaneLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_lap(&self) -> u32 {
        self.laps.len() as u32
    }

    pub fn laps(&self) -> &[RaceLap] {
        &self.laps
    }

    pub fn best_lap(&self) -> Option<&RaceLap> {
        self.best_lap.as_ref()
    }

    pub fn finish_time_ms(&self) -> Option<u64> {
        self.finish_time_ms
    }

    #[cfg(test)]
    pub(crate) fn lap_boundary_ms(&self) -> u64 {
        self.lap_boundary_ms
    }

    pub fn is_finished(&self, total_laps: u32) -> bool {
        total_laps > 0 && self.current_lap() >= total_laps
    }

    /// Record a lap crossed at `elapsed_ms`. A lane already at the lap cap
    /// ignores the call (`total_laps == 0` means uncapped). Returns whether
    /// a lap was recorded.
    pub fn record_lap(&mut self, elapsed_ms: u64, total_laps: u32) -> bool {
        if self.is_finished(total_laps) {
            return false;
        }

        let delta = elapsed_ms.saturating_sub(self.lap_boundary_ms);
        let lap = RaceLap {
            lap_number: self.current_lap() + 1,
            time: format_race_time(delta),
            timestamp: delta,
        };

        // a zero delta means the ledger state is inconsistent (e.g. two
        // crossings in the same clock sample); never a best-lap candidate
        let beats_best = self
            .best_lap
            .as_ref()
            .is_none_or(|best| delta < best.timestamp);
        if delta > 0 && beats_best {
            self.best_lap = Some(lap.clone());
        }

        self.laps.push(lap);
        self.lap_boundary_ms = elapsed_ms;

        if self.is_finished(total_laps) && self.finish_time_ms.is_none() {
            self.finish_time_ms = Some(elapsed_ms);
        }
        true
    }

    /// Undo the most recent lap: pop it, recompute the best lap from the
    /// survivors, and move the lap boundary back by the removed delta.
    /// The finish time, once set, stays set; undoing a lap does not
    /// reopen the lane. Returns whether a lap was removed.
    pub fn undo_lap(&mut self) -> bool {
        let Some(removed) = self.laps.pop() else {
            return false;
        };

        self.best_lap = self
            .laps
            .iter()
            .filter(|lap| lap.timestamp > 0)
            .min_by_key(|lap| lap.timestamp)
            .cloned();
        self.lap_boundary_ms = self.lap_boundary_ms.saturating_sub(removed.timestamp);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lap_captures_delta() {
        let mut ledger = LaneLedger::new();
        assert!(ledger.record_lap(1_500, 5));

        assert_eq!(ledger.current_lap(), 1);
        let lap = &ledger.laps()[0];
        assert_eq!(lap.lap_number, 1);
        assert_eq!(lap.timestamp, 1_500);
        assert_eq!(lap.time, "00:01.50");
        assert_eq!(ledger.best_lap(), Some(lap));
        assert_eq!(ledger.lap_boundary_ms(), 1_500);
        assert!(ledger.finish_time_ms().is_none());
    }

    #[test]
    fn test_best_lap_tracks_minimum_delta() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(2_000, 0);
        ledger.record_lap(3_200, 0); // 1200ms, new best
        ledger.record_lap(4_900, 0); // 1700ms, not a best

        assert_eq!(ledger.best_lap().unwrap().lap_number, 2);
        assert_eq!(ledger.best_lap().unwrap().timestamp, 1_200);
    }

    #[test]
    fn test_zero_delta_is_not_best_lap_eligible() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(0, 0);
        assert_eq!(ledger.current_lap(), 1);
        assert!(ledger.best_lap().is_none());

        ledger.record_lap(900, 0);
        assert_eq!(ledger.best_lap().unwrap().lap_number, 2);
    }

    #[test]
    fn test_cap_makes_increment_a_no_op() {
        let mut ledger = LaneLedger::new();
        assert!(ledger.record_lap(1_000, 2));
        assert!(ledger.record_lap(2_000, 2));
        assert!(!ledger.record_lap(3_000, 2));
        assert!(!ledger.record_lap(4_000, 2));

        assert_eq!(ledger.current_lap(), 2);
        assert_eq!(ledger.finish_time_ms(), Some(2_000));
    }

    #[test]
    fn test_uncapped_lane_keeps_counting() {
        let mut ledger = LaneLedger::new();
        for i in 1..=10 {
            assert!(ledger.record_lap(i * 1_000, 0));
        }
        assert_eq!(ledger.current_lap(), 10);
        assert!(ledger.finish_time_ms().is_none());
    }

    #[test]
    fn test_finish_time_set_once_at_cap() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(1_000, 3);
        ledger.record_lap(2_100, 3);
        assert!(ledger.finish_time_ms().is_none());
        ledger.record_lap(3_300, 3);
        assert_eq!(ledger.finish_time_ms(), Some(3_300));
    }

    #[test]
    fn test_undo_restores_pre_increment_state() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(1_000, 5);
        ledger.record_lap(1_900, 5);
        let snapshot = ledger.clone();

        ledger.record_lap(3_100, 5);
        assert!(ledger.undo_lap());

        // round-trip law: increment then decrement is the identity
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_undo_recomputes_best_from_survivors() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(2_000, 0); // 2000ms
        ledger.record_lap(3_200, 0); // 1200ms, best
        assert_eq!(ledger.best_lap().unwrap().lap_number, 2);

        ledger.undo_lap();
        assert_eq!(ledger.best_lap().unwrap().lap_number, 1);

        ledger.undo_lap();
        assert!(ledger.best_lap().is_none());
        assert_eq!(ledger.lap_boundary_ms(), 0);
    }

    #[test]
    fn test_undo_below_zero_is_a_no_op() {
        let mut ledger = LaneLedger::new();
        assert!(!ledger.undo_lap());
        assert_eq!(ledger, LaneLedger::new());
    }

    #[test]
    fn test_undo_does_not_clear_finish_time() {
        // observed behavior of the console: correcting a miscount after
        // the finish does not reopen the lane
        let mut ledger = LaneLedger::new();
        ledger.record_lap(1_000, 2);
        ledger.record_lap(2_000, 2);
        assert_eq!(ledger.finish_time_ms(), Some(2_000));

        ledger.undo_lap();
        assert_eq!(ledger.current_lap(), 1);
        assert_eq!(ledger.finish_time_ms(), Some(2_000));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ledger = LaneLedger::new();
        ledger.record_lap(1_000, 2);
        ledger.record_lap(2_000, 2);
        ledger.reset();
        assert_eq!(ledger, LaneLedger::new());
    }
}
