//! Error taxonomy for the job store, claim path, and scheduler.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a [`crate::store::JobStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Backend(err.into())
    }
}

/// Errors from [`crate::job::Job::claim`].
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Another caller won the atomic claim race first. Not a bug — the
    /// dispatcher treats this as "skip and continue".
    #[error("job {0} was already claimed")]
    AlreadyClaimed(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fatal, control-plane errors raised while constructing a [`crate::scheduler::Scheduler`].
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to set up the default log subscriber: {0}")]
    Logging(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
