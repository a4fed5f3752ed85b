//! Error Taxonomy
//!
//! Refresh-side failures (`Format`, `Transport`, `Timeout`) never reach a
//! query caller directly; they are parked in the orchestrator's error
//! mailbox. Query-side failures (`NotFound`, `InvalidInput`, `NotReady`)
//! are returned synchronously to whoever issued the query.

use std::time::Duration;

/// Errors produced by dataset refreshes and lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RadarError {
    /// Archive layout, row shape or numeric field is malformed
    #[error("format error: {0}")]
    Format(String),
    /// Fetch failed or the remote answered with a non-200 status
    #[error("transport error: {0}")]
    Transport(String),
    /// The refresh deadline expired before fetch and parse finished
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
    /// No record matches the query
    #[error("not found")]
    NotFound,
    /// Malformed identifier or unparseable IP address
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No dataset has been published yet
    #[error("not ready")]
    NotReady,
}

impl RadarError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error belongs to a refresh attempt rather than a query.
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Transport(_) | Self::Timeout(_)
        )
    }
}

impl From<zip::result::ZipError> for RadarError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Format(format!("zip: {}", e))
    }
}

impl From<csv::Error> for RadarError {
    fn from(e: csv::Error) -> Self {
        Self::Format(format!("row: {}", e))
    }
}

impl From<std::io::Error> for RadarError {
    fn from(e: std::io::Error) -> Self {
        Self::Format(format!("io: {}", e))
    }
}

/// The request URL is dropped: it may carry an access key in its query.
impl From<reqwest::Error> for RadarError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        let mut msg = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(msg)
    }
}

impl From<maxminddb::MaxMindDBError> for RadarError {
    fn from(e: maxminddb::MaxMindDBError) -> Self {
        Self::Format(format!("maxmind: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, RadarError>;
