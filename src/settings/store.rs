// Persistence for the settings aggregate: one JSON document in the
// platform data directory, read-merge-written as a whole on every change.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::errors::YonkuError;
use crate::settings::types::{AppSettings, Race, Vehicle, generate_id};

const SETTINGS_FILE_NAME: &str = "settings.json";
const MAX_LAP_COUNT: u32 = 20;

/// Race counter value used while a named heat bracket (semifinal, final,
/// repechage) is running; the next regular race restarts the sequence.
pub const RACE_NUMBER_SENTINEL: u32 = 0;

/// Interface for settings persistence and the field-level update helpers
/// built on top of it. Every helper is an independent read-modify-write:
/// it re-reads the persisted document immediately before merging, which
/// narrows (but does not close) the lost-update window between concurrent
/// callers. Last write wins.
pub trait SettingsStore {
    /// Load the persisted settings. A missing or unreadable document
    /// yields the defaults; the failure is logged, never raised.
    fn load(&self) -> AppSettings;

    /// Persist the entire aggregate as one atomic write.
    fn save(&mut self, settings: &AppSettings) -> Result<(), YonkuError>;

    fn set_lap_count(&mut self, lap_count: u32) -> Result<AppSettings, YonkuError>;
    fn set_sound_enabled(&mut self, enabled: bool) -> Result<AppSettings, YonkuError>;

    /// Assign a player (and their current vehicle, as a unit) to a course,
    /// or clear the course with `None`. Rejected if the player is already
    /// on another course.
    fn assign_course(
        &mut self,
        course_id: u8,
        player_id: Option<&str>,
    ) -> Result<AppSettings, YonkuError>;

    fn add_player(&mut self, name: &str) -> Result<AppSettings, YonkuError>;
    fn rename_player(&mut self, player_id: &str, name: &str) -> Result<AppSettings, YonkuError>;

    /// Remove a player. Any course referencing them is reset to empty.
    fn remove_player(&mut self, player_id: &str) -> Result<AppSettings, YonkuError>;

    /// Register (or replace) the player's vehicle. Courses that referenced
    /// the previous vehicle follow the new one.
    fn set_player_vehicle(
        &mut self,
        player_id: &str,
        vehicle_name: &str,
    ) -> Result<AppSettings, YonkuError>;

    fn rename_vehicle(&mut self, player_id: &str, name: &str) -> Result<AppSettings, YonkuError>;

    /// Remove the player's vehicle and clear its id from any course.
    fn remove_player_vehicle(&mut self, player_id: &str) -> Result<AppSettings, YonkuError>;

    /// Append a finished race to the history and advance the race counter:
    /// +1 for a regular race, reset to [`RACE_NUMBER_SENTINEL`] for named
    /// heats.
    fn record_race(&mut self, race: Race) -> Result<AppSettings, YonkuError>;

    fn delete_race(&mut self, race_id: &str) -> Result<AppSettings, YonkuError>;

    /// Drop the persisted document and return the defaults.
    fn reset(&mut self) -> Result<AppSettings, YonkuError>;
}

/// File-backed implementation of [`SettingsStore`].
pub struct FileBackedStore {
    settings_path: PathBuf,
}

impl FileBackedStore {
    pub fn new(settings_path: PathBuf) -> Result<Self, YonkuError> {
        if let Some(parent) = settings_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| YonkuError::SettingsIOError { source: e })?;
            }
        }
        Ok(Self { settings_path })
    }

    /// Store at the default location in the platform data directory.
    pub fn new_default() -> Result<Self, YonkuError> {
        Self::new(Self::default_settings_path()?)
    }

    pub fn default_settings_path() -> Result<PathBuf, YonkuError> {
        let data_dir = dirs::data_dir().ok_or(YonkuError::NoDataDir)?;
        Ok(data_dir.join("yonku").join(SETTINGS_FILE_NAME))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Read-merge-write: re-read the document, apply `mutate`, write the
    /// result back. `mutate` failing aborts before anything is written,
    /// so a rejected update leaves no partial state behind.
    fn update<F>(&mut self, mutate: F) -> Result<AppSettings, YonkuError>
    where
        F: FnOnce(&mut AppSettings) -> Result<(), YonkuError>,
    {
        let mut settings = self.load();
        mutate(&mut settings)?;
        self.write_out(&settings)?;
        Ok(settings)
    }

    fn write_out(&self, settings: &AppSettings) -> Result<(), YonkuError> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| YonkuError::SettingsSerializeError { source: e })?;

        // write to a temp file first so a crash mid-write cannot leave a
        // truncated document behind
        let temp_path = self.settings_path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| YonkuError::SettingsIOError { source: e })?;
        fs::rename(&temp_path, &self.settings_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            YonkuError::SettingsIOError { source: e }
        })
    }
}

impl SettingsStore for FileBackedStore {
    fn load(&self) -> AppSettings {
        if !self.settings_path.exists() {
            debug!("No settings file at {:?}, using defaults", self.settings_path);
            return AppSettings::default();
        }

        let content = match fs::read_to_string(&self.settings_path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read settings file: {e}");
                return AppSettings::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to parse settings file, using defaults: {e}");
                AppSettings::default()
            }
        }
    }

    fn save(&mut self, settings: &AppSettings) -> Result<(), YonkuError> {
        self.write_out(settings)
    }

    fn set_lap_count(&mut self, lap_count: u32) -> Result<AppSettings, YonkuError> {
        if !(1..=MAX_LAP_COUNT).contains(&lap_count) {
            return Err(YonkuError::InvalidUserInput {
                field: "lap_count".to_string(),
                reason: format!("must be between 1 and {MAX_LAP_COUNT}"),
            });
        }
        self.update(|settings| {
            settings.lap_count = lap_count;
            Ok(())
        })
    }

    fn set_sound_enabled(&mut self, enabled: bool) -> Result<AppSettings, YonkuError> {
        self.update(|settings| {
            settings.sound_enabled = enabled;
            Ok(())
        })
    }

    fn assign_course(
        &mut self,
        course_id: u8,
        player_id: Option<&str>,
    ) -> Result<AppSettings, YonkuError> {
        self.update(|settings| {
            let course_index = settings
                .courses
                .iter()
                .position(|c| c.id == course_id)
                .ok_or(YonkuError::CourseNotFound { course_id })?;

            let assignment = match player_id {
                None => None,
                Some(player_id) => {
                    let player = settings.player(player_id).ok_or_else(|| {
                        YonkuError::PlayerNotFound {
                            player_id: player_id.to_string(),
                        }
                    })?;

                    if let Some(taken) = settings
                        .courses
                        .iter()
                        .find(|c| c.id != course_id && c.player_id.as_deref() == Some(player_id))
                    {
                        return Err(YonkuError::PlayerAlreadyAssigned {
                            player_name: player.name.clone(),
                            course_id: taken.id,
                        });
                    }

                    // the vehicle id follows the player as a unit
                    let vehicle_id = player.vehicle.as_ref().map(|v| v.id.clone());
                    Some((player.id.clone(), vehicle_id))
                }
            };

            let course = &mut settings.courses[course_index];
            match assignment {
                None => course.clear_assignment(),
                Some((player_id, vehicle_id)) => {
                    course.player_id = Some(player_id);
                    course.vehicle_id = vehicle_id;
                }
            }
            Ok(())
        })
    }

    fn add_player(&mut self, name: &str) -> Result<AppSettings, YonkuError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(YonkuError::InvalidUserInput {
                field: "name".to_string(),
                reason: "player name cannot be empty".to_string(),
            });
        }
        let player = crate::settings::Player {
            id: generate_id("p"),
            name: name.to_string(),
            team_name: None,
            vehicle: None,
        };
        info!("Adding player {} ({})", player.name, player.id);
        self.update(|settings| {
            settings.players.push(player);
            Ok(())
        })
    }

    fn rename_player(&mut self, player_id: &str, name: &str) -> Result<AppSettings, YonkuError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(YonkuError::InvalidUserInput {
                field: "name".to_string(),
                reason: "player name cannot be empty".to_string(),
            });
        }
        self.update(|settings| {
            let player = settings
                .players
                .iter_mut()
                .find(|p| p.id == player_id)
                .ok_or_else(|| YonkuError::PlayerNotFound {
                    player_id: player_id.to_string(),
                })?;
            player.name = name.to_string();
            Ok(())
        })
    }

    fn remove_player(&mut self, player_id: &str) -> Result<AppSettings, YonkuError> {
        info!("Removing player {player_id}");
        self.update(|settings| {
            let before = settings.players.len();
            settings.players.retain(|p| p.id != player_id);
            if settings.players.len() == before {
                return Err(YonkuError::PlayerNotFound {
                    player_id: player_id.to_string(),
                });
            }

            // cascade: free any course the player was holding
            for course in settings.courses.iter_mut() {
                if course.player_id.as_deref() == Some(player_id) {
                    course.clear_assignment();
                }
            }
            Ok(())
        })
    }

    fn set_player_vehicle(
        &mut self,
        player_id: &str,
        vehicle_name: &str,
    ) -> Result<AppSettings, YonkuError> {
        let vehicle_name = vehicle_name.trim();
        if vehicle_name.is_empty() {
            return Err(YonkuError::InvalidUserInput {
                field: "vehicle_name".to_string(),
                reason: "vehicle name cannot be empty".to_string(),
            });
        }
        let vehicle = Vehicle {
            id: generate_id("v"),
            name: vehicle_name.to_string(),
        };
        self.update(|settings| {
            let player = settings
                .players
                .iter_mut()
                .find(|p| p.id == player_id)
                .ok_or_else(|| YonkuError::PlayerNotFound {
                    player_id: player_id.to_string(),
                })?;
            let previous_id = player.vehicle.as_ref().map(|v| v.id.clone());
            player.vehicle = Some(vehicle.clone());

            // courses that raced the old machine follow the new one
            for course in settings.courses.iter_mut() {
                if course.player_id.as_deref() == Some(player_id)
                    && course.vehicle_id == previous_id
                {
                    course.vehicle_id = Some(vehicle.id.clone());
                }
            }
            Ok(())
        })
    }

    fn rename_vehicle(&mut self, player_id: &str, name: &str) -> Result<AppSettings, YonkuError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(YonkuError::InvalidUserInput {
                field: "vehicle_name".to_string(),
                reason: "vehicle name cannot be empty".to_string(),
            });
        }
        self.update(|settings| {
            let player = settings
                .players
                .iter_mut()
                .find(|p| p.id == player_id)
                .ok_or_else(|| YonkuError::PlayerNotFound {
                    player_id: player_id.to_string(),
                })?;
            match player.vehicle.as_mut() {
                Some(vehicle) => {
                    vehicle.name = name.to_string();
                    Ok(())
                }
                None => Err(YonkuError::InvalidUserInput {
                    field: "vehicle".to_string(),
                    reason: format!("player {player_id} has no vehicle"),
                }),
            }
        })
    }

    fn remove_player_vehicle(&mut self, player_id: &str) -> Result<AppSettings, YonkuError> {
        self.update(|settings| {
            let player = settings
                .players
                .iter_mut()
                .find(|p| p.id == player_id)
                .ok_or_else(|| YonkuError::PlayerNotFound {
                    player_id: player_id.to_string(),
                })?;
            let Some(removed) = player.vehicle.take() else {
                return Ok(());
            };

            for course in settings.courses.iter_mut() {
                if course.vehicle_id.as_deref() == Some(removed.id.as_str()) {
                    course.vehicle_id = None;
                }
            }
            Ok(())
        })
    }

    fn record_race(&mut self, race: Race) -> Result<AppSettings, YonkuError> {
        info!(
            "Recording race {} ({} results)",
            race.name,
            race.results.len()
        );
        self.update(|settings| {
            settings.current_race_number = if race.is_regular() {
                settings.current_race_number + 1
            } else {
                RACE_NUMBER_SENTINEL
            };
            settings.races.push(race);
            Ok(())
        })
    }

    fn delete_race(&mut self, race_id: &str) -> Result<AppSettings, YonkuError> {
        self.update(|settings| {
            let before = settings.races.len();
            settings.races.retain(|r| r.id != race_id);
            if settings.races.len() == before {
                return Err(YonkuError::RaceNotFound {
                    race_id: race_id.to_string(),
                });
            }
            Ok(())
        })
    }

    fn reset(&mut self) -> Result<AppSettings, YonkuError> {
        if self.settings_path.exists() {
            fs::remove_file(&self.settings_path)
                .map_err(|e| YonkuError::SettingsIOError { source: e })?;
        }
        Ok(AppSettings::default())
    }
}
