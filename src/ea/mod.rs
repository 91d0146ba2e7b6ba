//! Client for the EA Pro Clubs stats API.
//!
//! The API is rate limited and unreliable: responses may be throttled,
//! transiently failing or structurally surprising (arrays sometimes arrive
//! wrapped in objects, numbers as strings). Everything defensive about
//! talking to it lives here.

mod client;
mod types;

pub use client::{DEFAULT_BASE_URL, EaApiClient};
pub use types::{
    MatchesPayload, MembersPayload, ParseError, RawMatch, RawMember, RawStat, parse_match,
};

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("EA responded {0}")]
    Status(StatusCode),

    #[error("decoding raw response error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    /// Transient failures are worth retrying; malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(_) => true,
            SourceError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            SourceError::Decode(_) => false,
        }
    }
}
