//! Storage adapters: the match collection and the snapshot documents.
//!
//! The rest of the pipeline only sees the [`MatchStore`] and
//! [`SnapshotStore`] traits; the SQLite implementation lives in
//! [`sqlite::SqliteStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::league::{Match, aggregate::LeagueSnapshot, season::SeasonSnapshot};

mod sqlite;

pub use sqlite::SqliteStore;

/// Upper bound on operations per atomic write batch, mirroring the document
/// store's batch limit.
pub const MAX_BATCH_OPS: usize = 400;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document could not be (de)serialized: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("write batch holds {0} ops, limit is {MAX_BATCH_OPS}")]
    BatchTooLarge(usize),
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    Put(Match),
    Delete(String),
}

/// Explicit builder for batched writes. Knows its own operation count so
/// callers commit only non-empty batches and can split oversized ones.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, m: Match) {
        self.ops.push(WriteOp::Put(m));
    }

    pub fn delete(&mut self, match_id: impl Into<String>) {
        self.ops.push(WriteOp::Delete(match_id.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Splits the batch into chunks of at most `max` ops, each committable
    /// as one atomic batch. Empty input yields no chunks.
    pub fn into_chunks(self, max: usize) -> Vec<WriteBatch> {
        let mut chunks = Vec::new();
        let mut current = WriteBatch::new();
        for op in self.ops {
            if current.len() == max {
                chunks.push(std::mem::take(&mut current));
            }
            current.ops.push(op);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// The persistent collection of match documents keyed by match id.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Match>, StoreError>;

    /// Ids of every stored match, for ingest-time existence checks.
    async fn ids(&self) -> Result<HashSet<String>, StoreError>;

    /// The most recent `limit` matches by timestamp, newest first.
    /// Matches without a timestamp sort last.
    async fn recent(&self, limit: u32) -> Result<Vec<Match>, StoreError>;

    /// Applies one batch atomically: either every op lands or none does.
    /// Fails with [`StoreError::BatchTooLarge`] beyond [`MAX_BATCH_OPS`].
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Single-document storage for the computed snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put_league(&self, snapshot: &LeagueSnapshot) -> Result<(), StoreError>;
    async fn get_league(&self) -> Result<Option<LeagueSnapshot>, StoreError>;

    async fn put_season(&self, snapshot: &SeasonSnapshot) -> Result<(), StoreError>;
    async fn get_season(&self) -> Result<Option<SeasonSnapshot>, StoreError>;
}
