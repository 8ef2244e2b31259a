// Error types for yonku

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum YonkuError {
    // Settings persistence errors
    #[snafu(display("Could not find application data directory to save settings"))]
    NoDataDir,
    #[snafu(display("Error writing settings file"))]
    SettingsIOError { source: io::Error },
    #[snafu(display("Error serializing settings"))]
    SettingsSerializeError { source: serde_json::Error },

    // Roster and course assignment errors
    #[snafu(display("Course {course_id} does not exist"))]
    CourseNotFound { course_id: u8 },
    #[snafu(display("Player {player_id} does not exist"))]
    PlayerNotFound { player_id: String },
    #[snafu(display("Player {player_name} is already assigned to course {course_id}"))]
    PlayerAlreadyAssigned { player_name: String, course_id: u8 },
    #[snafu(display("Race {race_id} does not exist"))]
    RaceNotFound { race_id: String },
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // Race session errors
    #[snafu(display("Lane {lane_id} does not exist, lanes are numbered 1 to 4"))]
    InvalidLane { lane_id: u8 },
    #[snafu(display("Invalid race time: {value}"))]
    InvalidTimeFormat { value: String },

    // Start gate errors
    #[snafu(display("Start gate is not connected"))]
    GateNotConnected,
    #[snafu(display("Start gate serial port error"))]
    GatePortError { source: serialport::Error },
    #[snafu(display("Error writing to start gate"))]
    GateIOError { source: io::Error },
}
