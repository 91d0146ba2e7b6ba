use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::league::{Match, aggregate::LeagueSnapshot, season::SeasonSnapshot};

use super::{MAX_BATCH_OPS, MatchStore, SnapshotStore, StoreError, WriteBatch, WriteOp};

const LEAGUE_SNAPSHOT_ID: &str = "league";
const SEASON_SNAPSHOT_ID: &str = "season";

/// SQLite-backed document store. Matches and snapshots are stored as JSON
/// documents keyed by id; batched writes run in one transaction each.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);

        // One connection keeps every batch on the same handle, matching the
        // cooperative single-process model.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        info!("match store ready");
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS matches (
                match_id TEXT PRIMARY KEY,
                ts INTEGER,
                doc TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS snapshots (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn put_snapshot(&self, id: &str, doc: String) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO snapshots (id, doc) VALUES (?, ?)")
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT doc FROM snapshots WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM matches")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| serde_json::from_str(&row.get::<String, _>(0)).map_err(StoreError::from))
            .collect()
    }

    async fn ids(&self) -> Result<HashSet<String>, StoreError> {
        let rows = sqlx::query("SELECT match_id FROM matches")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get::<String, _>(0)).collect())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM matches ORDER BY ts IS NULL, ts DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| serde_json::from_str(&row.get::<String, _>(0)).map_err(StoreError::from))
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge(batch.len()));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for op in batch.ops() {
            match op {
                WriteOp::Put(m) => {
                    let doc = serde_json::to_string(m)?;
                    sqlx::query(
                        "INSERT OR REPLACE INTO matches (match_id, ts, doc) VALUES (?, ?, ?)",
                    )
                    .bind(&m.match_id)
                    .bind(m.timestamp)
                    .bind(doc)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete(id) => {
                    sqlx::query("DELETE FROM matches WHERE match_id = ?")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn put_league(&self, snapshot: &LeagueSnapshot) -> Result<(), StoreError> {
        self.put_snapshot(LEAGUE_SNAPSHOT_ID, serde_json::to_string(snapshot)?)
            .await
    }

    async fn get_league(&self) -> Result<Option<LeagueSnapshot>, StoreError> {
        match self.get_snapshot(LEAGUE_SNAPSHOT_ID).await? {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn put_season(&self, snapshot: &SeasonSnapshot) -> Result<(), StoreError> {
        self.put_snapshot(SEASON_SNAPSHOT_ID, serde_json::to_string(snapshot)?)
            .await
    }

    async fn get_season(&self) -> Result<Option<SeasonSnapshot>, StoreError> {
        match self.get_snapshot(SEASON_SNAPSHOT_ID).await? {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::aggregate::league_snapshot;
    use crate::league::testutil::*;

    #[tokio::test]
    async fn put_get_and_delete_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();

        let mut batch = WriteBatch::new();
        batch.put(fixture("m1", Some(100), side(1, 2), side(2, 1)));
        batch.put(fixture("m2", None, side(2, 0), side(3, 0)));
        store.commit(batch).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.ids().await.unwrap().len(), 2);

        let mut batch = WriteBatch::new();
        batch.delete("m1");
        store.commit(batch).await.unwrap();

        let ids = store.ids().await.unwrap();
        assert!(!ids.contains("m1"));
        assert!(ids.contains("m2"));
    }

    #[tokio::test]
    async fn put_overwrites_existing_document() {
        let store = SqliteStore::in_memory().await.unwrap();

        let mut batch = WriteBatch::new();
        batch.put(fixture("m1", Some(100), side(1, 2), side(2, 1)));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.put(fixture("m1", Some(100), side(1, 5), side(2, 1)));
        store.commit(batch).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].home.goals, 5);
    }

    #[tokio::test]
    async fn recent_orders_newest_first_with_untimestamped_last() {
        let store = SqliteStore::in_memory().await.unwrap();

        let mut batch = WriteBatch::new();
        batch.put(fixture("old", Some(100), side(1, 0), side(2, 0)));
        batch.put(fixture("new", Some(300), side(1, 0), side(2, 0)));
        batch.put(fixture("unstamped", None, side(1, 0), side(2, 0)));
        store.commit(batch).await.unwrap();

        let recent = store.recent(3).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "unstamped"]);

        let top = store.recent(1).await.unwrap();
        assert_eq!(top[0].match_id, "new");
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_whole() {
        let store = SqliteStore::in_memory().await.unwrap();

        let mut batch = WriteBatch::new();
        for i in 0..(MAX_BATCH_OPS + 1) {
            batch.put(fixture(&format!("m{i}"), Some(1), side(1, 0), side(2, 0)));
        }

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge(_)));
        assert!(store.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_commit_is_a_no_op() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.commit(WriteBatch::new()).await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn league_snapshot_replaces_prior_document() {
        let store = SqliteStore::in_memory().await.unwrap();
        let roster = roster();

        assert!(store.get_league().await.unwrap().is_none());

        let first = league_snapshot(&[], &roster, 1);
        store.put_league(&first).await.unwrap();

        let matches = vec![fixture("m1", Some(100), side(1, 1), side(2, 0))];
        let second = league_snapshot(&matches, &roster, 2);
        store.put_league(&second).await.unwrap();

        let stored = store.get_league().await.unwrap().unwrap();
        assert_eq!(stored.updated_at, 2);
        assert_eq!(stored.standings.len(), 2);
    }
}
