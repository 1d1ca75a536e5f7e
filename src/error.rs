//! Error taxonomy shared by the fetcher, the pipeline and the outputs.
//!
//! Each failure class maps to one variant of [`NewsError`]:
//!
//! | Variant | Raised by | Effect |
//! |---------|-----------|--------|
//! | [`NewsError::Config`] | settings validation, constructors | nothing is started |
//! | [`NewsError::Fetch`] | one page request | aborts the owning worker |
//! | [`NewsError::Destination`] | CSV sink / `save_news` | aborts the whole invocation |
//! | [`NewsError::GateClosed`] | request gate | aborts the owning worker |
//! | [`NewsError::Task`] | a worker or sink task panicked | aborts the invocation |

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, NewsError>;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to fetch page {page}: {cause}")]
    Fetch {
        page: u32,
        #[source]
        cause: FetchCause,
    },

    #[error("destination error: {0}")]
    Destination(String),

    #[error("request gate closed")]
    GateClosed,

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Underlying reason a single page request failed.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("malformed body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl NewsError {
    pub fn fetch(page: u32, cause: impl Into<FetchCause>) -> Self {
        NewsError::Fetch {
            page,
            cause: cause.into(),
        }
    }

    pub fn destination(msg: impl Into<String>) -> Self {
        NewsError::Destination(msg.into())
    }

    /// Page number for fetch failures.
    pub fn page(&self) -> Option<u32> {
        match self {
            NewsError::Fetch { page, .. } => Some(*page),
            _ => None,
        }
    }
}

impl From<StatusCode> for FetchCause {
    fn from(status: StatusCode) -> Self {
        FetchCause::Status(status)
    }
}
