// Result compiler: turns the four lane ledgers of a finished (or
// abandoned) session into a ranked, immutable Race record.

use chrono::Utc;

use crate::settings::{AppSettings, Race, RaceResult, generate_id};
use crate::timing::{RaceSession, format_race_time, parse_race_time};

/// A course resolved against the roster: player and vehicle names
/// materialized for the result record. Lanes without a resolvable player
/// stay unassigned and produce no result.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneAssignment {
    pub course_id: u8,
    pub player_id: Option<String>,
    pub player_name: Option<String>,
    pub team_name: Option<String>,
    pub vehicle_id: Option<String>,
    pub vehicle_name: Option<String>,
}

/// Resolve every course's player/vehicle ids into names. A course whose
/// player id no longer matches a roster entry resolves as unassigned.
pub fn lane_assignments(settings: &AppSettings) -> Vec<LaneAssignment> {
    settings
        .courses
        .iter()
        .map(|course| {
            let player = course
                .player_id
                .as_deref()
                .and_then(|id| settings.player(id));
            let vehicle = player.and_then(|p| {
                p.vehicle
                    .as_ref()
                    .filter(|v| course.vehicle_id.as_deref() == Some(v.id.as_str()))
            });
            LaneAssignment {
                course_id: course.id,
                player_id: player.map(|p| p.id.clone()),
                player_name: player.map(|p| p.name.clone()),
                team_name: player.and_then(|p| p.team_name.clone()),
                vehicle_id: vehicle.map(|v| v.id.clone()),
                vehicle_name: vehicle.map(|v| v.name.clone()),
            }
        })
        .collect()
}

/// Compile the session's lanes into a Race record. Unassigned lanes are
/// skipped; a race where nobody was assigned compiles to an empty result
/// set, which is accepted and persisted as-is.
pub fn compile_race(
    session: &RaceSession,
    assignments: &[LaneAssignment],
    race_number: u32,
    race_type: Option<String>,
) -> Race {
    let race_id = generate_id("race");
    let total_laps = session.total_laps();

    let mut results: Vec<RaceResult> = assignments
        .iter()
        .filter(|a| a.player_name.is_some())
        .filter_map(|assignment| {
            let lane = session.lane(assignment.course_id).ok()?;
            // finished lanes report their finish time; everyone else gets
            // the stopwatch reading at race end
            let total_time_ms = lane.finish_time_ms().unwrap_or(session.elapsed_ms());
            Some(RaceResult {
                id: format!("{race_id}-c{}", assignment.course_id),
                race_id: race_id.clone(),
                position: 0,
                player_id: assignment.player_id.clone(),
                player_name: assignment.player_name.clone().unwrap_or_default(),
                team_name: assignment.team_name.clone(),
                vehicle_id: assignment.vehicle_id.clone(),
                vehicle_name: assignment.vehicle_name.clone().unwrap_or_default(),
                total_time: format_race_time(total_time_ms),
                laps: lane.laps().to_vec(),
                best_lap: lane.best_lap().cloned(),
                is_completed: lane.is_finished(total_laps),
            })
        })
        .collect();

    sort_and_position(&mut results);

    let name = match race_type.as_deref() {
        Some(kind) if !kind.is_empty() => kind.to_string(),
        _ => format!("Race {race_number}"),
    };

    Race {
        id: race_id,
        name,
        date: Utc::now().to_rfc3339(),
        race_number,
        race_type,
        total_laps,
        results,
    }
}

/// Rank results in place: more laps completed wins, ties broken by total
/// time ascending. Positions are reassigned 1-based in sorted order.
pub fn sort_and_position(results: &mut [RaceResult]) {
    results.sort_by(|a, b| {
        b.laps
            .len()
            .cmp(&a.laps.len())
            .then_with(|| total_time_ms(a).cmp(&total_time_ms(b)))
    });
    for (index, result) in results.iter_mut().enumerate() {
        result.position = index as u32 + 1;
    }
}

fn total_time_ms(result: &RaceResult) -> u64 {
    // total_time is produced by format_race_time so this only fails on
    // hand-edited history; rank those entries last
    parse_race_time(&result.total_time).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Course, Player, RaceLap, Vehicle};
    use crate::timing::RaceSession;
    use crate::timing::clock::test_support::FakeClock;

    fn result_with(laps: usize, total_time: &str) -> RaceResult {
        RaceResult {
            id: format!("res-{laps}-{total_time}"),
            race_id: "race1".to_string(),
            position: 0,
            player_id: None,
            player_name: format!("laps{laps}"),
            team_name: None,
            vehicle_id: None,
            vehicle_name: String::new(),
            total_time: total_time.to_string(),
            laps: (1..=laps as u32)
                .map(|n| RaceLap {
                    lap_number: n,
                    time: "00:01.00".to_string(),
                    timestamp: 1_000,
                })
                .collect(),
            best_lap: None,
            is_completed: false,
        }
    }

    fn roster_settings() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.players = vec![
            Player {
                id: "p1".to_string(),
                name: "Aoi".to_string(),
                team_name: Some("Sonic Works".to_string()),
                vehicle: Some(Vehicle {
                    id: "v1".to_string(),
                    name: "Magnum".to_string(),
                }),
            },
            Player {
                id: "p2".to_string(),
                name: "Ren".to_string(),
                team_name: None,
                vehicle: None,
            },
        ];
        settings.courses = vec![
            Course {
                id: 1,
                player_id: Some("p1".to_string()),
                vehicle_id: Some("v1".to_string()),
            },
            Course {
                id: 2,
                player_id: Some("p2".to_string()),
                vehicle_id: None,
            },
            Course::empty(3),
            Course {
                id: 4,
                player_id: Some("ghost".to_string()),
                vehicle_id: None,
            },
        ];
        settings
    }

    #[test]
    fn test_sort_more_laps_first_then_faster_time() {
        let mut results = vec![
            result_with(3, "00:08.00"),
            result_with(5, "00:10.00"),
            result_with(5, "00:09.00"),
            result_with(2, "00:07.00"),
        ];
        sort_and_position(&mut results);

        let order: Vec<(usize, &str)> = results
            .iter()
            .map(|r| (r.laps.len(), r.total_time.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, "00:09.00"),
                (5, "00:10.00"),
                (3, "00:08.00"),
                (2, "00:07.00"),
            ]
        );
        let positions: Vec<u32> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unparsable_total_time_ranks_last() {
        let mut results = vec![result_with(5, "garbage"), result_with(5, "00:30.00")];
        sort_and_position(&mut results);
        assert_eq!(results[0].total_time, "00:30.00");
    }

    #[test]
    fn test_lane_assignments_resolve_names() {
        let assignments = lane_assignments(&roster_settings());
        assert_eq!(assignments.len(), 4);

        assert_eq!(assignments[0].player_name.as_deref(), Some("Aoi"));
        assert_eq!(assignments[0].team_name.as_deref(), Some("Sonic Works"));
        assert_eq!(assignments[0].vehicle_name.as_deref(), Some("Magnum"));

        assert_eq!(assignments[1].player_name.as_deref(), Some("Ren"));
        assert!(assignments[1].vehicle_name.is_none());

        // empty course and dangling player id both resolve unassigned
        assert!(assignments[2].player_name.is_none());
        assert!(assignments[3].player_name.is_none());
    }

    #[test]
    fn test_compile_race_skips_unassigned_lanes() {
        let clock = FakeClock::default();
        let mut session = RaceSession::new(Box::new(clock.clone()), 2);
        session.start();

        // lane 1 finishes, lane 2 is still a lap short at race end
        clock.advance(1_000);
        session.increment_lap(1).unwrap();
        session.increment_lap(2).unwrap();
        clock.advance(1_000);
        session.increment_lap(1).unwrap();
        clock.advance(500);
        session.tick();
        session.pause();

        let race = compile_race(&session, &lane_assignments(&roster_settings()), 3, None);

        assert_eq!(race.race_number, 3);
        assert_eq!(race.name, "Race 3");
        assert_eq!(race.total_laps, 2);
        assert_eq!(race.results.len(), 2);

        let winner = &race.results[0];
        assert_eq!(winner.player_name, "Aoi");
        assert_eq!(winner.position, 1);
        assert!(winner.is_completed);
        assert_eq!(winner.total_time, "00:02.00"); // finish time, not race end
        assert_eq!(winner.laps.len(), 2);
        assert_eq!(winner.best_lap.as_ref().unwrap().timestamp, 1_000);

        let runner_up = &race.results[1];
        assert_eq!(runner_up.player_name, "Ren");
        assert_eq!(runner_up.position, 2);
        assert!(!runner_up.is_completed);
        assert_eq!(runner_up.total_time, "00:02.50"); // stopwatch at race end
    }

    #[test]
    fn test_compile_race_with_no_assignments_is_empty_not_an_error() {
        let clock = FakeClock::default();
        let session = RaceSession::new(Box::new(clock), 3);
        let race = compile_race(&session, &lane_assignments(&AppSettings::default()), 1, None);
        assert!(race.results.is_empty());
    }

    #[test]
    fn test_named_heat_takes_its_type_as_name() {
        let clock = FakeClock::default();
        let session = RaceSession::new(Box::new(clock), 3);
        let race = compile_race(
            &session,
            &[],
            7,
            Some("semifinal".to_string()),
        );
        assert_eq!(race.name, "semifinal");
        assert_eq!(race.race_type.as_deref(), Some("semifinal"));
        assert!(!race.is_regular());
    }
}
