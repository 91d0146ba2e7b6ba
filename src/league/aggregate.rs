//! Rolling league aggregation: folds retained matches into a standings table
//! and per-player leaderboards.
//!
//! Pure functions over a slice of matches. Every run recomputes from scratch
//! and produces a brand new [`LeagueSnapshot`] which replaces the stored one
//! wholesale, so no cross-run state can leak.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ClubId, Match, Roster};

/// How many entries a leaderboard keeps.
pub const LEADERBOARD_SIZE: usize = 10;

const POINTS_WIN: u32 = 3;
const POINTS_DRAW: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
}

/// Derives the per-side results of a fixture from the goal counts.
pub fn side_results(goals_home: u32, goals_away: u32) -> (MatchResult, MatchResult) {
    if goals_home > goals_away {
        (MatchResult::Win, MatchResult::Loss)
    } else if goals_home < goals_away {
        (MatchResult::Loss, MatchResult::Win)
    } else {
        (MatchResult::Draw, MatchResult::Draw)
    }
}

/// One row of the rolling league table, recomputed on every aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
    pub id: ClubId,
    pub name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl StandingRow {
    fn new(id: ClubId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    fn record(&mut self, result: MatchResult, scored: u32, conceded: u32) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match result {
            MatchResult::Win => {
                self.wins += 1;
                self.points += POINTS_WIN;
            }
            MatchResult::Draw => {
                self.draws += 1;
                self.points += POINTS_DRAW;
            }
            MatchResult::Loss => self.losses += 1,
        }
    }
}

/// A cumulative per-player stat total, keyed by (display name, player id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub player_id: String,
    pub value: u32,
}

/// Immutable computed view replacing any prior view wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueSnapshot {
    /// Milliseconds since epoch.
    pub updated_at: i64,
    pub standings: Vec<StandingRow>,
    pub top_scorers: Vec<LeaderboardEntry>,
    pub top_assisters: Vec<LeaderboardEntry>,
}

/// Folds all retained matches into the rolling league table.
///
/// Clubs outside the roster are ignored for standings but never double
/// counted: the known side of a mixed fixture still records its goals and
/// result. Only clubs that appear in at least one match get a row.
pub fn build_standings(matches: &[Match], roster: &Roster) -> Vec<StandingRow> {
    let mut rows: HashMap<ClubId, StandingRow> = HashMap::new();
    let mut order: Vec<ClubId> = Vec::new();

    for m in matches {
        let (home_result, away_result) = side_results(m.home.goals, m.away.goals);
        let pairs = [
            (&m.home, home_result, m.away.goals),
            (&m.away, away_result, m.home.goals),
        ];

        for (side, result, conceded) in pairs {
            let Some(name) = roster.name_of(side.club_id) else {
                continue;
            };
            let row = rows.entry(side.club_id).or_insert_with(|| {
                order.push(side.club_id);
                StandingRow::new(side.club_id, name)
            });
            row.record(result, side.goals, conceded);
        }
    }

    let mut table: Vec<StandingRow> = order.into_iter().filter_map(|id| rows.remove(&id)).collect();
    // Rolling league policy: points, then wins. Goal difference is
    // deliberately not a tie-breaker here, unlike the season ranking.
    table.sort_by(|a, b| b.points.cmp(&a.points).then(b.wins.cmp(&a.wins)));
    table
}

/// Accumulates one per-player stat across all matches into a leaderboard.
///
/// Zero contributions are not inserted; ties keep first-seen order because
/// the final sort is stable.
fn build_leaderboard(matches: &[Match], stat: impl Fn(&super::PlayerLine) -> u32) -> Vec<LeaderboardEntry> {
    let mut totals: Vec<LeaderboardEntry> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for m in matches {
        for side in m.sides() {
            for player in &side.players {
                let amount = stat(player);
                if amount == 0 {
                    continue;
                }
                let key = (player.name.clone(), player.player_id.clone());
                match index.get(&key) {
                    Some(&i) => totals[i].value += amount,
                    None => {
                        index.insert(key, totals.len());
                        totals.push(LeaderboardEntry {
                            name: player.name.clone(),
                            player_id: player.player_id.clone(),
                            value: amount,
                        });
                    }
                }
            }
        }
    }

    totals.sort_by(|a, b| b.value.cmp(&a.value));
    totals.truncate(LEADERBOARD_SIZE);
    totals
}

pub fn build_scorer_leaderboard(matches: &[Match]) -> Vec<LeaderboardEntry> {
    build_leaderboard(matches, |p| p.goals)
}

pub fn build_assist_leaderboard(matches: &[Match]) -> Vec<LeaderboardEntry> {
    build_leaderboard(matches, |p| p.assists)
}

/// Computes a fresh rolling league snapshot from the given matches.
pub fn league_snapshot(matches: &[Match], roster: &Roster, updated_at: i64) -> LeagueSnapshot {
    LeagueSnapshot {
        updated_at,
        standings: build_standings(matches, roster),
        top_scorers: build_scorer_leaderboard(matches),
        top_assisters: build_assist_leaderboard(matches),
    }
}
