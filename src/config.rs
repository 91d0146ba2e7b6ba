use std::collections::HashMap;
use std::env;

use crate::ea::DEFAULT_BASE_URL;
use crate::error::AppError;
use crate::league::{Club, ClubId, Roster, SeasonRules};

/// Season start used when `SEASON_START` is not set: 2025-07-01 00:00 UTC.
const DEFAULT_SEASON_START: i64 = 1_751_328_000;
const DEFAULT_RETENTION_CAP: usize = 10;
const DEFAULT_DATABASE_URL: &str = "sqlite:clubtally.db";

const DEFAULT_INGEST_INTERVAL_SECS: u64 = 600;
const DEFAULT_LEAGUE_SNAPSHOT_INTERVAL_SECS: u64 = 3_600;
const DEFAULT_SEASON_SNAPSHOT_INTERVAL_SECS: u64 = 21_600;

/// Immutable application configuration, loaded once at process start and
/// passed by reference into every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub ea_base_url: String,
    pub roster: Roster,
    pub rules: SeasonRules,
    pub ingest_interval_secs: u64,
    pub league_snapshot_interval_secs: u64,
    pub season_snapshot_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());
        let ea_base_url = env::var("EA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

        let roster = match env::var("ROSTER_PATH") {
            Ok(path) => load_roster(&path)?,
            Err(_) => Roster::new(default_roster()),
        };
        if roster.is_empty() {
            return Err(AppError::Config("the club roster must not be empty".into()));
        }

        let season_start = parse_env("SEASON_START")?.unwrap_or(DEFAULT_SEASON_START);
        let retention_cap = parse_env("RETENTION_CAP")?.unwrap_or(DEFAULT_RETENTION_CAP);
        let skip_before = parse_skip_before(env::var("SKIP_BEFORE").ok().as_deref())?;

        Ok(Self {
            database_url,
            ea_base_url,
            roster,
            rules: SeasonRules { season_start, retention_cap, skip_before },
            ingest_interval_secs: parse_env("INGEST_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_INGEST_INTERVAL_SECS),
            league_snapshot_interval_secs: parse_env("LEAGUE_SNAPSHOT_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_LEAGUE_SNAPSHOT_INTERVAL_SECS),
            season_snapshot_interval_secs: parse_env("SEASON_SNAPSHOT_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_SEASON_SNAPSHOT_INTERVAL_SECS),
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{name} is not a valid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn load_roster(path: &str) -> Result<Roster, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read roster file {path}: {e}")))?;
    let clubs: Vec<Club> = serde_json::from_str(&raw)
        .map_err(|e| AppError::Config(format!("invalid roster file {path}: {e}")))?;
    Ok(Roster::new(clubs))
}

/// Parses per-club skip overrides of the form `clubId=timestamp,...`.
fn parse_skip_before(raw: Option<&str>) -> Result<HashMap<ClubId, i64>, AppError> {
    let mut map = HashMap::new();
    let Some(raw) = raw else {
        return Ok(map);
    };

    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (club, cutoff) = pair
            .split_once('=')
            .ok_or_else(|| AppError::Config(format!("invalid SKIP_BEFORE entry: {pair}")))?;
        let club: ClubId = club
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("invalid club id in SKIP_BEFORE: {club}")))?;
        let cutoff: i64 = cutoff
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("invalid cutoff in SKIP_BEFORE: {cutoff}")))?;
        map.insert(club, cutoff);
    }
    Ok(map)
}

fn default_roster() -> Vec<Club> {
    [
        (2_491_998, "Royal Republic"),
        (1_527_486, "Gungan FC"),
        (1_969_494, "Club Frijol"),
        (2_086_022, "Brehemen"),
        (2_462_194, "Costa Chica FC"),
        (5_098_824, "Sporting de la ma"),
        (4_869_810, "Afc Tekki"),
        (576_007, "Ethabella FC"),
        (4_933_507, "Loss Toyz"),
        (4_824_736, "GoldenGoals FC"),
        (481_847, "Rooney tunes"),
        (3_050_467, "invincible afc"),
        (4_154_835, "khalch Fc"),
        (3_638_105, "Real mvc"),
        (55_408, "Elite VT"),
        (4_819_681, "EVERYTHING DEAD"),
        (35_642, "EBK FC"),
    ]
    .into_iter()
    .map(|(id, name)| Club { id, name: name.to_string() })
    .collect()
}
