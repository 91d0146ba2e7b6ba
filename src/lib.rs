//! Pro Clubs league tracker.
//!
//! Periodically pulls match results for a fixed roster of clubs from the EA
//! Pro Clubs stats API, stores them with deduplication and a bounded
//! per-club retention window, and recomputes standings and leaderboard
//! snapshots from the retained matches.

pub mod config;
pub mod ea;
pub mod error;
pub mod league;
pub mod logging;
pub mod scheduler;
pub mod store;

pub use config::Config;
pub use error::AppError;
pub use scheduler::LeaguePipeline;
