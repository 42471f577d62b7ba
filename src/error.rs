//! Error types shared by the fetch adapters and the poll loop.

use thiserror::Error;

/// Failure of a call to one of the upstream read APIs.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The upstream quota or rate limit is exhausted. Polling should back off.
    #[error("API quota exceeded")]
    QuotaExhausted,

    /// Transport-level failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The API answered successfully but the body lacked expected fields.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No usable access token could be obtained.
    #[error("authorization error: {0}")]
    Auth(String),
}

impl FetchError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, FetchError::QuotaExhausted)
    }
}

/// Failure of a single poll cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CycleError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, CycleError::Fetch(e) if e.is_quota_exhausted())
    }
}
