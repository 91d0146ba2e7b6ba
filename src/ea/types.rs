//! Raw EA payload shapes and their conversion into domain matches.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;

use crate::league::{ClubId, Match, MatchSide, PlayerLine};

/// A numeric stat as EA serializes it: sometimes a number, sometimes a
/// string holding one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawStat {
    Num(i64),
    Text(String),
}

impl Default for RawStat {
    fn default() -> Self {
        RawStat::Num(0)
    }
}

impl RawStat {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawStat::Num(n) => Some(*n),
            RawStat::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|n| u32::try_from(n).ok())
    }
}

/// Match ids arrive as strings but have been observed as bare numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Num(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Num(n) => n.to_string(),
        }
    }
}

/// One match as returned by the clubs/matches endpoint.
///
/// Club keys are kept in a sorted map so the home/away assignment is
/// deterministic regardless of JSON key order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
    #[serde(rename = "matchId")]
    pub match_id: Option<RawId>,
    pub timestamp: Option<RawStat>,
    #[serde(default)]
    pub clubs: BTreeMap<String, RawClubSide>,
    #[serde(default)]
    pub players: HashMap<String, HashMap<String, RawPlayer>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawClubSide {
    pub goals: Option<RawStat>,
    #[serde(default)]
    pub details: Option<RawClubDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawClubDetails {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    pub playername: Option<String>,
    #[serde(default)]
    pub goals: RawStat,
    #[serde(default)]
    pub assists: RawStat,
    #[serde(default)]
    pub saves: RawStat,
    pub pos: Option<String>,
}

/// One member as returned by the members/stats endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    pub name: Option<String>,
    #[serde(default, rename = "gamesPlayed")]
    pub games_played: RawStat,
    #[serde(default)]
    pub goals: RawStat,
    #[serde(default)]
    pub assists: RawStat,
    #[serde(rename = "favoritePosition")]
    pub position: Option<String>,
}

/// The matches endpoint returns either an array of matches or an object
/// whose values are arrays to be concatenated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MatchesPayload {
    List(Vec<RawMatch>),
    Grouped(HashMap<String, Vec<RawMatch>>),
}

impl MatchesPayload {
    pub fn into_matches(self) -> Vec<RawMatch> {
        match self {
            MatchesPayload::List(list) => list,
            MatchesPayload::Grouped(map) => map.into_values().flatten().collect(),
        }
    }
}

/// The members endpoint has been seen as a `{members: [...]}` wrapper, a
/// bare array, and a map of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MembersPayload {
    Wrapped { members: Vec<RawMember> },
    List(Vec<RawMember>),
    Map(HashMap<String, RawMember>),
}

impl MembersPayload {
    pub fn into_members(self) -> Vec<RawMember> {
        match self {
            MembersPayload::Wrapped { members } => members,
            MembersPayload::List(list) => list,
            MembersPayload::Map(map) => map.into_values().collect(),
        }
    }
}

/// Why a raw match was rejected during parsing. Rejected matches never
/// reach the store or aggregation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("match has no id")]
    MissingId,

    #[error("match {0} lists {1} clubs, expected exactly 2")]
    WrongClubCount(String, usize),

    #[error("match {0} has a non-numeric club id: {1}")]
    BadClubId(String, String),

    #[error("match {0} is missing a parseable goal count")]
    BadGoals(String),
}

/// Validates and converts one raw match into the domain model.
pub fn parse_match(raw: RawMatch) -> Result<Match, ParseError> {
    let match_id = raw
        .match_id
        .map(RawId::into_string)
        .filter(|id| !id.is_empty())
        .ok_or(ParseError::MissingId)?;

    if raw.clubs.len() != 2 {
        return Err(ParseError::WrongClubCount(match_id, raw.clubs.len()));
    }

    let mut sides = Vec::with_capacity(2);
    for (club_key, club) in raw.clubs {
        let club_id: ClubId = club_key
            .parse()
            .map_err(|_| ParseError::BadClubId(match_id.clone(), club_key.clone()))?;

        let goals = club
            .goals
            .as_ref()
            .and_then(RawStat::as_u32)
            .ok_or_else(|| ParseError::BadGoals(match_id.clone()))?;

        let players = raw
            .players
            .get(&club_key)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|(player_id, p)| {
                        // Players without a name carry no usable identity.
                        let name = p.playername.clone()?;
                        Some(PlayerLine {
                            player_id: player_id.clone(),
                            name,
                            goals: p.goals.as_u32().unwrap_or(0),
                            assists: p.assists.as_u32().unwrap_or(0),
                            saves: p.saves.as_u32().unwrap_or(0),
                            position: p.pos.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        sides.push(MatchSide {
            club_id,
            club_name: club.details.and_then(|d| d.name),
            goals,
            players,
        });
    }

    let away = sides.pop().expect("two sides checked above");
    let home = sides.pop().expect("two sides checked above");

    Ok(Match {
        match_id,
        timestamp: raw.timestamp.and_then(|ts| ts.as_i64()),
        home,
        away,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_a_full_match_with_string_stats() {
        let m = raw(json!({
            "matchId": "m1",
            "timestamp": 1_700_000_000,
            "clubs": {
                "1": {"goals": "3", "details": {"name": "Royal Republic"}},
                "2": {"goals": 1}
            },
            "players": {
                "1": {
                    "p9": {"playername": "Pele", "goals": "2", "assists": "1", "saves": "0", "pos": "forward"}
                }
            }
        }));

        let parsed = parse_match(m).unwrap();
        assert_eq!(parsed.match_id, "m1");
        assert_eq!(parsed.timestamp, Some(1_700_000_000));
        assert_eq!(parsed.home.club_id, 1);
        assert_eq!(parsed.home.goals, 3);
        assert_eq!(parsed.home.club_name.as_deref(), Some("Royal Republic"));
        assert_eq!(parsed.home.players.len(), 1);
        assert_eq!(parsed.home.players[0].goals, 2);
        assert_eq!(parsed.away.club_id, 2);
        assert_eq!(parsed.away.goals, 1);
    }

    #[test]
    fn numeric_match_ids_become_strings() {
        let m = raw(json!({
            "matchId": 42,
            "clubs": {"1": {"goals": 0}, "2": {"goals": 0}}
        }));
        assert_eq!(parse_match(m).unwrap().match_id, "42");
    }

    #[test]
    fn missing_id_is_rejected() {
        let m = raw(json!({"clubs": {"1": {"goals": 0}, "2": {"goals": 0}}}));
        assert_eq!(parse_match(m).unwrap_err(), ParseError::MissingId);
    }

    #[test]
    fn wrong_club_count_is_rejected() {
        let m = raw(json!({"matchId": "m1", "clubs": {"1": {"goals": 0}}}));
        assert!(matches!(
            parse_match(m).unwrap_err(),
            ParseError::WrongClubCount(_, 1)
        ));
    }

    #[test]
    fn unparseable_goals_are_rejected() {
        let m = raw(json!({
            "matchId": "m1",
            "clubs": {"1": {"goals": "??"}, "2": {"goals": 0}}
        }));
        assert_eq!(
            parse_match(m).unwrap_err(),
            ParseError::BadGoals("m1".into())
        );

        let m = raw(json!({
            "matchId": "m2",
            "clubs": {"1": {}, "2": {"goals": 0}}
        }));
        assert!(matches!(parse_match(m).unwrap_err(), ParseError::BadGoals(_)));
    }

    #[test]
    fn players_without_a_name_are_dropped() {
        let m = raw(json!({
            "matchId": "m1",
            "clubs": {"1": {"goals": 1}, "2": {"goals": 0}},
            "players": {
                "1": {
                    "anon": {"goals": "5"},
                    "p9": {"playername": "Pele", "goals": 1}
                }
            }
        }));

        let parsed = parse_match(m).unwrap();
        assert_eq!(parsed.home.players.len(), 1);
        assert_eq!(parsed.home.players[0].name, "Pele");
    }

    #[test]
    fn matches_payload_accepts_list_and_grouped_shapes() {
        let list: MatchesPayload = serde_json::from_value(json!([
            {"matchId": "a", "clubs": {}},
        ]))
        .unwrap();
        assert_eq!(list.into_matches().len(), 1);

        let grouped: MatchesPayload = serde_json::from_value(json!({
            "league": [{"matchId": "a", "clubs": {}}],
            "cup": [{"matchId": "b", "clubs": {}}, {"matchId": "c", "clubs": {}}]
        }))
        .unwrap();
        assert_eq!(grouped.into_matches().len(), 3);
    }

    #[test]
    fn members_payload_accepts_all_three_shapes() {
        let wrapped: MembersPayload =
            serde_json::from_value(json!({"members": [{"name": "A"}]})).unwrap();
        assert_eq!(wrapped.into_members().len(), 1);

        let list: MembersPayload = serde_json::from_value(json!([{"name": "A"}])).unwrap();
        assert_eq!(list.into_members().len(), 1);

        let map: MembersPayload =
            serde_json::from_value(json!({"0": {"name": "A"}, "1": {"name": "B"}})).unwrap();
        assert_eq!(map.into_members().len(), 2);
    }

    #[test]
    fn negative_stats_read_as_unparseable() {
        let stat = RawStat::Num(-3);
        assert_eq!(stat.as_u32(), None);
        let stat = RawStat::Text(" 7 ".into());
        assert_eq!(stat.as_u32(), Some(7));
    }
}
