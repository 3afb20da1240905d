//! Error types for cryptal-tasker
//!
//! Expected network failures never surface through this module: every HTTP
//! call resolves to a [`RequestOutcome`](crate::request::RequestOutcome)
//! instead. The variants here cover the remaining failure modes — unusable
//! credentials, client construction, and the two per-account phases that
//! are allowed to fail (task fetching, statistics).

use thiserror::Error;

/// Result type alias for cryptal-tasker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cryptal-tasker
#[derive(Debug, Error)]
pub enum Error {
    /// Credential problem (unreadable token file, token unusable as a header)
    #[error("credential error: {0}")]
    Credentials(String),

    /// Network error escaping the retry boundary (client construction only)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Task catalog or availability fetch failed for one account
    #[error("task fetch failed: {0}")]
    TaskFetch(String),

    /// Statistics fetch failed for one account
    #[error("statistics fetch failed: {0}")]
    Statistics(String),
}
