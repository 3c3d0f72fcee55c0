//! Error types for tracker access and report generation.

use thiserror::Error;

/// Errors that can occur while talking to the issue tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Tracker returned a non-success status
    #[error("Jira API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Search matched more issues than a single page holds
    #[error("Incomplete result set: {fetched} of {total} issues returned")]
    Incomplete { total: u64, fetched: u64 },
}

/// Errors surfaced by the report operations.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Sprint name was blank
    #[error("Sprint is empty")]
    EmptySprint,

    /// No task keys left after filtering blanks
    #[error("Empty task list")]
    EmptyTaskList,

    /// Tracker interaction failed
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl ReportError {
    /// Whether the caller can fix this by retrying with different input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptySprint | Self::EmptyTaskList)
    }
}
