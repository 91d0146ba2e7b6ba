//! Recurring pipeline runs and the call surface exposed to the routing
//! layer.
//!
//! Three independent timers drive the system: a short ingestion sweep, an
//! hourly league snapshot rebuild and a periodic full-season rebuild. A
//! failed run is logged and never stops future invocations. Sweeps, trims
//! and corrective deletes serialize on one in-process lock; snapshot
//! rebuilds only read the match collection and may run concurrently with
//! them.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::ea::{EaApiClient, RawMember, parse_match};
use crate::error::AppError;
use crate::league::aggregate::{LeagueSnapshot, league_snapshot};
use crate::league::ingest::{ingest, season_counts};
use crate::league::season::{SeasonSnapshot, season_snapshot};
use crate::league::{ClubId, Match, trim};
use crate::store::{MatchStore, SnapshotStore, SqliteStore};

/// What one ingestion sweep did, for logging and the trigger surface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub fetched: usize,
    pub malformed: usize,
    pub saved: usize,
    pub trimmed: usize,
    pub clubs_unavailable: usize,
}

pub struct LeaguePipeline {
    ea: Arc<EaApiClient>,
    store: Arc<SqliteStore>,
    config: Arc<Config>,
    /// Serializes mutating passes (sweep, trim, corrective deletes) across
    /// overlapping triggers.
    run_lock: Mutex<()>,
}

impl LeaguePipeline {
    pub fn new(ea: Arc<EaApiClient>, store: Arc<SqliteStore>, config: Arc<Config>) -> Arc<Self> {
        Arc::new(Self { ea, store, config, run_lock: Mutex::new(()) })
    }

    /// Spawns the three recurring loops.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        info!(
            ingest_secs = self.config.ingest_interval_secs,
            league_secs = self.config.league_snapshot_interval_secs,
            season_secs = self.config.season_snapshot_interval_secs,
            "pipeline timers started"
        );

        vec![
            self.spawn_loop(self.config.ingest_interval_secs, |p| async move {
                p.run_ingest_sweep().await.map(|report| {
                    info!(?report, "ingestion sweep finished");
                })
            }),
            self.spawn_loop(self.config.league_snapshot_interval_secs, |p| async move {
                p.rebuild_league_snapshot().await.map(|snap| {
                    info!(clubs = snap.standings.len(), "league snapshot rebuilt");
                })
            }),
            self.spawn_loop(self.config.season_snapshot_interval_secs, |p| async move {
                p.rebuild_season_snapshot().await.map(|snap| {
                    info!(clubs = snap.standings.len(), "season snapshot rebuilt");
                })
            }),
        ]
    }

    fn spawn_loop<F, Fut>(self: &Arc<Self>, secs: u64, run: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(secs));
            loop {
                timer.tick().await;
                if let Err(e) = run(Arc::clone(&pipeline)).await {
                    error!(error = %e, "scheduled pipeline run failed");
                }
            }
        })
    }

    /// One full ingestion sweep: clean old, fetch every club, ingest, trim.
    ///
    /// A club whose fetch fails contributes nothing this round; the sweep
    /// carries on for the others.
    pub async fn run_ingest_sweep(&self) -> Result<SweepReport, AppError> {
        let _guard = self.run_lock.lock().await;
        let mut report = SweepReport::default();

        trim::clean_old(self.store.as_ref(), &self.config.rules).await?;

        let fetches = self.config.roster.clubs().iter().map(|club| {
            let ea = Arc::clone(&self.ea);
            async move { (club.id, ea.fetch_matches(club.id).await) }
        });

        let mut fetched: Vec<Match> = Vec::new();
        for (club_id, result) in join_all(fetches).await {
            let raws = match result {
                Ok(raws) => raws,
                Err(e) => {
                    warn!(club_id, error = %e, "stats source unavailable for club");
                    report.clubs_unavailable += 1;
                    continue;
                }
            };
            report.fetched += raws.len();
            for raw in raws {
                match parse_match(raw) {
                    Ok(m) => fetched.push(m),
                    Err(e) => {
                        debug!(club_id, error = %e, "dropping malformed match record");
                        report.malformed += 1;
                    }
                }
            }
        }

        let existing = self.store.ids().await?;
        let stored = self.store.get_all().await?;
        let mut counts = season_counts(&stored, &self.config.rules);

        report.saved = ingest(
            self.store.as_ref(),
            &self.config.rules,
            &self.config.roster,
            fetched,
            &existing,
            &mut counts,
        )
        .await?;

        report.trimmed = trim::trim(self.store.as_ref(), &self.config.rules).await?;
        Ok(report)
    }

    /// Recomputes the rolling league snapshot from all retained matches and
    /// replaces the stored one.
    pub async fn rebuild_league_snapshot(&self) -> Result<LeagueSnapshot, AppError> {
        let matches = self.store.get_all().await?;
        let snapshot = league_snapshot(&matches, &self.config.roster, now_millis());
        self.store.put_league(&snapshot).await?;
        Ok(snapshot)
    }

    /// Recomputes the full-season snapshot, including the playoff bracket
    /// and player season stats.
    pub async fn rebuild_season_snapshot(&self) -> Result<SeasonSnapshot, AppError> {
        let matches = self.store.get_all().await?;
        let snapshot = season_snapshot(&matches, &self.config.roster, now_millis());
        self.store.put_season(&snapshot).await?;
        Ok(snapshot)
    }

    /// The latest stored league snapshot, if any run completed yet.
    pub async fn current_league_snapshot(&self) -> Result<Option<LeagueSnapshot>, AppError> {
        Ok(self.store.get_league().await?)
    }

    pub async fn current_season_snapshot(&self) -> Result<Option<SeasonSnapshot>, AppError> {
        Ok(self.store.get_season().await?)
    }

    /// The most recent raw matches, newest first.
    pub async fn recent_matches(&self, limit: u32) -> Result<Vec<Match>, AppError> {
        Ok(self.store.recent(limit).await?)
    }

    /// Administrative cleanup: drop a club's matches before a cutoff.
    pub async fn delete_before(&self, club_id: ClubId, cutoff: i64) -> Result<usize, AppError> {
        let _guard = self.run_lock.lock().await;
        Ok(trim::delete_before(self.store.as_ref(), club_id, cutoff).await?)
    }

    /// Member stats for the whole roster, concatenated across clubs. Clubs
    /// whose fetch fails are skipped.
    pub async fn collect_members(&self) -> Vec<RawMember> {
        let fetches = self.config.roster.clubs().iter().map(|club| {
            let ea = Arc::clone(&self.ea);
            async move { (club.id, ea.fetch_members(club.id).await) }
        });

        let mut all = Vec::new();
        for (club_id, result) in join_all(fetches).await {
            match result {
                Ok(members) => all.extend(members),
                Err(e) => warn!(club_id, error = %e, "member stats unavailable for club"),
            }
        }
        all
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
