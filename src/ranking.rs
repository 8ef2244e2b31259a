// Ranking aggregation: reduces the full race history into per-player
// standings (wins, races entered, best lap time).

use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;

use crate::settings::Race;

/// One row of the overall standings table.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerStanding {
    pub position: u32,
    pub player_id: Option<String>,
    pub player_name: String,
    pub team_name: Option<String>,
    pub wins: u32,
    pub races: u32,
    /// Best lap time across all recorded races, as `mm:ss.cc`. The format
    /// is fixed-width zero-padded, so the lexicographic minimum is also
    /// the numeric minimum.
    pub best_time: Option<String>,
}

/// Compute the standings over the whole race history. Players are grouped
/// by id, falling back to the display name for results recorded before
/// player ids existed. Ordering is wins descending, then best time
/// ascending (players without a recorded best lap sort last); further
/// ties keep the order players first appear in the history.
pub fn compute_standings(races: &[Race]) -> Vec<PlayerStanding> {
    let mut standings: Vec<PlayerStanding> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for race in races {
        for result in &race.results {
            let key = result
                .player_id
                .clone()
                .unwrap_or_else(|| result.player_name.clone());
            let index = *index_by_key.entry(key).or_insert_with(|| {
                standings.push(PlayerStanding {
                    position: 0,
                    player_id: result.player_id.clone(),
                    player_name: result.player_name.clone(),
                    team_name: result.team_name.clone(),
                    wins: 0,
                    races: 0,
                    best_time: None,
                });
                standings.len() - 1
            });

            let entry = &mut standings[index];
            entry.races += 1;
            if result.position == 1 {
                entry.wins += 1;
            }
            if entry.team_name.is_none() {
                entry.team_name = result.team_name.clone();
            }
            if let Some(best_lap) = &result.best_lap {
                let beats = entry
                    .best_time
                    .as_deref()
                    .is_none_or(|current| best_lap.time.as_str() < current);
                if beats {
                    entry.best_time = Some(best_lap.time.clone());
                }
            }
        }
    }

    let mut standings: Vec<PlayerStanding> = standings
        .into_iter()
        .sorted_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then_with(|| compare_best_times(&a.best_time, &b.best_time))
        })
        .collect();
    for (index, standing) in standings.iter_mut().enumerate() {
        standing.position = index as u32 + 1;
    }
    standings
}

fn compare_best_times(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
