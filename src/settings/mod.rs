pub(crate) mod store;
pub(crate) mod types;

pub use store::{FileBackedStore, RACE_NUMBER_SENTINEL, SettingsStore};
pub use types::{AppSettings, COURSE_COUNT, Course, Player, Race, RaceLap, RaceResult, Vehicle};

pub(crate) use types::generate_id;
