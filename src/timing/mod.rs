pub(crate) mod clock;
pub(crate) mod ledger;
pub(crate) mod session;

pub use clock::{Clock, SystemClock};
pub use ledger::LaneLedger;
pub use session::{RaceSession, StopwatchState, LANE_COUNT};

use crate::YonkuError;

/// Format a millisecond duration as `mm:ss.cc` (centisecond precision).
/// All fields are zero-padded to width 2 so the strings stay comparable
/// lexicographically; minutes grow past two digits for very long races.
pub fn format_race_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms / 1_000) % 60;
    let centis = (ms / 10) % 100;
    format!("{:02}:{:02}.{:02}", minutes, seconds, centis)
}

/// Parse a `mm:ss.cc` string back into milliseconds. Exact inverse of
/// [`format_race_time`] for centisecond-aligned values; sub-centisecond
/// information is not representable in this format.
pub fn parse_race_time(value: &str) -> Result<u64, YonkuError> {
    let invalid = || YonkuError::InvalidTimeFormat {
        value: value.to_string(),
    };

    let (minutes_part, rest) = value.split_once(':').ok_or_else(invalid)?;
    let (seconds_part, centis_part) = rest.split_once('.').ok_or_else(invalid)?;

    let minutes: u64 = minutes_part.parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds_part.parse().map_err(|_| invalid())?;
    let centis: u64 = centis_part.parse().map_err(|_| invalid())?;

    if seconds_part.len() != 2 || centis_part.len() != 2 || seconds >= 60 || centis >= 100 {
        return Err(invalid());
    }

    Ok(minutes * 60_000 + seconds * 1_000 + centis * 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_pads_fields() {
        assert_eq!(format_race_time(0), "00:00.00");
        assert_eq!(format_race_time(1_500), "00:01.50");
        assert_eq!(format_race_time(59_990), "00:59.99");
        assert_eq!(format_race_time(60_000), "01:00.00");
        assert_eq!(format_race_time(83_450), "01:23.45");
    }

    #[test]
    fn test_format_minutes_grow_past_two_digits() {
        assert_eq!(format_race_time(100 * 60_000), "100:00.00");
        assert_eq!(parse_race_time("100:00.00").unwrap(), 100 * 60_000);
    }

    #[test]
    fn test_format_truncates_sub_centisecond() {
        // 1509ms and 1500ms render the same, the parse recovers the
        // centisecond-aligned value
        assert_eq!(format_race_time(1_509), "00:01.50");
        assert_eq!(parse_race_time("00:01.50").unwrap(), 1_500);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in ["", "00:00", "00.00.00", "0:0.0", "00:60.00", "00:00.xx", "-1:00.00"] {
            assert!(parse_race_time(bad).is_err(), "accepted {bad:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip_centisecond_aligned(centis in 0u64..=100 * 60 * 100) {
            let ms = centis * 10;
            prop_assert_eq!(parse_race_time(&format_race_time(ms)).unwrap(), ms);
        }
    }
}
