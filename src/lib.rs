// Library interface for yonku
// This allows integration tests to access internal modules

pub mod errors;
pub mod gate;
pub mod ranking;
pub mod results;
pub mod settings;
pub mod timing;

// Re-export commonly used types
pub use errors::YonkuError;
pub use gate::{GateCommand, GateLink, SerialGateLink};
pub use ranking::{PlayerStanding, compute_standings};
pub use results::{LaneAssignment, compile_race, lane_assignments};
pub use settings::{AppSettings, FileBackedStore, Race, RaceLap, RaceResult, SettingsStore};
pub use timing::{Clock, LaneLedger, RaceSession, SystemClock};
