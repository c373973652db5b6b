//! Crate-wide error taxonomy.

use thiserror::Error;

use crate::topic::Topic;

/// The five transient failure kinds a single fetch attempt can terminate in.
///
/// All five are transient at the service level: every one of them leads to
/// a scheduled retry via the retry scheduler. None of them is fatal on its
/// own; only retirement of the topic or service shutdown suppresses retry.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("no ready-to-serve replica is available for topic {0}")]
    NoReplica(Topic),

    #[error("replica returned non-2xx status {status} for topic {topic}")]
    HttpError { topic: Topic, status: u16 },

    #[error("replica response body for topic {0} was empty or unreadable")]
    BadResponse(Topic),

    #[error("fetch for topic {0} exceeded the per-request deadline")]
    Timeout(Topic),

    #[error("transport error fetching topic {topic}: {message}")]
    Transport { topic: Topic, message: String },
}

impl FetchError {
    pub fn topic(&self) -> &Topic {
        match self {
            FetchError::NoReplica(t) => t,
            FetchError::HttpError { topic, .. } => topic,
            FetchError::BadResponse(t) => t,
            FetchError::Timeout(t) => t,
            FetchError::Transport { topic, .. } => topic,
        }
    }
}

/// Errors surfaced by the service's own lifecycle, as opposed to a single
/// fetch attempt.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(
        "warm-up failed: {failed} of {attempted} dictionary-eligible version(s) were not \
         installed within the {deadline_ms}ms warm-up deadline"
    )]
    WarmUpFailed {
        attempted: usize,
        failed: usize,
        deadline_ms: u64,
    },

    #[error("service has already been started")]
    AlreadyStarted,

    #[error("service is not running")]
    NotRunning,

    #[error("metadata repository is unavailable: {0}")]
    MetadataUnavailable(String),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
