// Core data structures shared by the race console, the settings store,
// and the ranking view. Field names are camelCase on the wire to stay
// compatible with settings blobs written by earlier releases.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of fixed racing lanes on the course.
pub const COURSE_COUNT: usize = 4;

/// A registered Mini 4WD machine. Owned by exactly one player at a time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
}

/// A registered racer (a "team" in later UI revisions, hence the optional
/// team name).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub vehicle: Option<Vehicle>,
}

/// One of the four fixed lanes and its current player/vehicle assignment.
/// `vehicle_id` always refers to the vehicle owned by `player_id`; the two
/// fields move as a unit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: u8,
    pub player_id: Option<String>,
    pub vehicle_id: Option<String>,
}

impl Course {
    pub fn empty(id: u8) -> Self {
        Self {
            id,
            player_id: None,
            vehicle_id: None,
        }
    }

    pub fn clear_assignment(&mut self) {
        self.player_id = None;
        self.vehicle_id = None;
    }
}

/// A single completed lap. `timestamp` is the raw lap delta in
/// milliseconds, `time` the same delta rendered as `mm:ss.cc`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RaceLap {
    pub lap_number: u32,
    pub time: String,
    pub timestamp: u64,
}

/// One lane's outcome in a finished race. Derived by the result compiler,
/// never mutated afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub id: String,
    pub race_id: String,
    pub position: u32,
    pub player_id: Option<String>,
    pub player_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_name: String,
    pub total_time: String,
    pub laps: Vec<RaceLap>,
    pub best_lap: Option<RaceLap>,
    #[serde(default)]
    pub is_completed: bool,
}

/// A completed heat. Immutable once saved; deletable as a whole by id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: String,
    pub name: String,
    pub date: String,
    pub race_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_type: Option<String>,
    pub total_laps: u32,
    pub results: Vec<RaceResult>,
}

impl Race {
    /// Regular races advance the race counter; named heats (semifinal,
    /// final, repechage) sit outside the numbered sequence.
    pub fn is_regular(&self) -> bool {
        self.race_type.as_deref().is_none_or(str::is_empty)
    }
}

/// Root settings aggregate. Persisted as a single JSON document; missing
/// fields fall back to defaults so blobs from older releases keep loading.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub courses: Vec<Course>,
    pub players: Vec<Player>,
    pub lap_count: u32,
    pub sound_enabled: bool,
    pub races: Vec<Race>,
    pub current_race_number: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            courses: (1..=COURSE_COUNT as u8).map(Course::empty).collect(),
            players: Vec::new(),
            lap_count: 5,
            sound_enabled: false,
            races: Vec::new(),
            current_race_number: 1,
        }
    }
}

impl AppSettings {
    pub fn course(&self, course_id: u8) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }
}

/// Identifier in the `p<epoch-millis>` style the app has always used.
pub(crate) fn generate_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{prefix}{millis}")
}
