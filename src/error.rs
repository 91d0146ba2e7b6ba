use thiserror::Error;

use crate::{ea::SourceError, store::StoreError};

/// Top level error type surfaced at pipeline run boundaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("stats source error: {0}")]
    Source(#[from] SourceError),

    #[error("configuration error: {0}")]
    Config(String),
}
