//! Full-season snapshot: season standings, the top-4 playoff bracket and
//! cumulative per-player season statistics.
//!
//! The season table ranks by points, then goal difference, then goals for.
//! This deliberately differs from the rolling league policy (points, then
//! wins); the two rankings stay separate named policies.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::aggregate::{MatchResult, side_results};
use super::roles::Role;
use super::{ClubId, Match, Roster};

/// One row of the season table. Every roster club gets a row, even with no
/// matches played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStandingRow {
    pub id: ClubId,
    pub name: String,
    pub played: u32,
    pub wins: u32,
    pub ties: u32,
    pub losses: u32,
    pub goals: u32,
    pub goals_against: u32,
    pub points: u32,
    pub win_percent: f64,
}

impl SeasonStandingRow {
    fn new(id: ClubId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            played: 0,
            wins: 0,
            ties: 0,
            losses: 0,
            goals: 0,
            goals_against: 0,
            points: 0,
            win_percent: 0.0,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals) - i64::from(self.goals_against)
    }
}

/// A semi-final pairing seeded from the season table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemiFinal {
    pub home: SeasonStandingRow,
    pub away: SeasonStandingRow,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalTie {
    pub home: String,
    pub away: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayoffBracket {
    pub semi_finals: Vec<SemiFinal>,
    #[serde(rename = "final")]
    pub final_round: Vec<FinalTie>,
}

/// Cumulative season statistics for one player, keyed by display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSeasonLine {
    pub name: String,
    pub club: String,
    pub goals: u32,
    pub assists: u32,
    pub saves: u32,
    pub clean_sheets: u32,
    pub matches: u32,
    pub win_count: u32,
    /// Appearances per normalized role label.
    pub roles: HashMap<String, u32>,
    pub team: ClubId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSnapshot {
    /// Milliseconds since epoch.
    pub updated_at: i64,
    pub standings: Vec<SeasonStandingRow>,
    pub playoffs: PlayoffBracket,
    pub player_stats: Vec<PlayerSeasonLine>,
}

/// Season ranking policy: points, then goal difference, then goals for.
fn season_order(a: &SeasonStandingRow, b: &SeasonStandingRow) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(b.goal_difference().cmp(&a.goal_difference()))
        .then(b.goals.cmp(&a.goals))
}

/// Builds the season table over the full roster.
pub fn build_season_standings(matches: &[Match], roster: &Roster) -> Vec<SeasonStandingRow> {
    let mut rows: HashMap<ClubId, SeasonStandingRow> = roster
        .clubs()
        .iter()
        .map(|c| (c.id, SeasonStandingRow::new(c.id, &c.name)))
        .collect();

    for m in matches {
        let (home_result, away_result) = side_results(m.home.goals, m.away.goals);
        let pairs = [
            (&m.home, home_result, m.away.goals),
            (&m.away, away_result, m.home.goals),
        ];
        for (side, result, conceded) in pairs {
            let Some(row) = rows.get_mut(&side.club_id) else {
                continue;
            };
            row.played += 1;
            row.goals += side.goals;
            row.goals_against += conceded;
            match result {
                MatchResult::Win => {
                    row.wins += 1;
                    row.points += 3;
                }
                MatchResult::Draw => {
                    row.ties += 1;
                    row.points += 1;
                }
                MatchResult::Loss => row.losses += 1,
            }
        }
    }

    let mut table: Vec<SeasonStandingRow> = rows.into_values().collect();
    for row in &mut table {
        row.win_percent = if row.played > 0 {
            f64::from(row.wins) / f64::from(row.played)
        } else {
            0.0
        };
    }
    table.sort_by(season_order);
    table
}

/// Seeds the playoff bracket from the top four: 1v4 and 2v3, final TBD.
pub fn build_playoffs(standings: &[SeasonStandingRow]) -> PlayoffBracket {
    let top4: Vec<&SeasonStandingRow> = standings.iter().take(4).collect();
    let semi_finals = if top4.len() == 4 {
        vec![
            SemiFinal { home: top4[0].clone(), away: top4[3].clone(), score: "TBD".into() },
            SemiFinal { home: top4[1].clone(), away: top4[2].clone(), score: "TBD".into() },
        ]
    } else {
        Vec::new()
    };

    PlayoffBracket {
        semi_finals,
        final_round: vec![FinalTie {
            home: "Winner SF1".into(),
            away: "Winner SF2".into(),
            score: "TBD".into(),
        }],
    }
}

/// Accumulates per-player season totals across all matches.
///
/// A clean sheet is credited to goalkeeper appearances where the opposing
/// side finished scoreless.
pub fn build_player_stats(matches: &[Match], roster: &Roster) -> Vec<PlayerSeasonLine> {
    let mut stats: HashMap<String, PlayerSeasonLine> = HashMap::new();

    for m in matches {
        let pairs = [(&m.home, m.away.goals), (&m.away, m.home.goals)];
        for (side, opponent_goals) in pairs {
            let club_name = roster
                .name_of(side.club_id)
                .unwrap_or("Unknown")
                .to_string();
            let won = side.goals > opponent_goals;

            for player in &side.players {
                let role = Role::from_raw(player.position.as_deref());
                let line = stats
                    .entry(player.name.clone())
                    .or_insert_with(|| PlayerSeasonLine {
                        name: player.name.clone(),
                        club: club_name.clone(),
                        goals: 0,
                        assists: 0,
                        saves: 0,
                        clean_sheets: 0,
                        matches: 0,
                        win_count: 0,
                        roles: HashMap::new(),
                        team: side.club_id,
                    });

                line.goals += player.goals;
                line.assists += player.assists;
                line.saves += player.saves;
                line.matches += 1;
                *line.roles.entry(role.as_str().to_string()).or_insert(0) += 1;
                if won {
                    line.win_count += 1;
                }
                if role == Role::Goalkeeper && opponent_goals == 0 {
                    line.clean_sheets += 1;
                }
            }
        }
    }

    let mut lines: Vec<PlayerSeasonLine> = stats.into_values().collect();
    lines.sort_by(|a, b| a.name.cmp(&b.name));
    lines
}

/// Computes a fresh full-season snapshot from the given matches.
pub fn season_snapshot(matches: &[Match], roster: &Roster, updated_at: i64) -> SeasonSnapshot {
    let standings = build_season_standings(matches, roster);
    let playoffs = build_playoffs(&standings);
    let player_stats = build_player_stats(matches, roster);
    SeasonSnapshot { updated_at, standings, playoffs, player_stats }
}
