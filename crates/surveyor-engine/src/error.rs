//! Error types for surveyor-engine

use std::time::Duration;

use thiserror::Error;

/// Failures a probe source can report
///
/// These never cross the orchestrator boundary: each one is absorbed into
/// the next fallback step or an explicit empty payload.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Source engine is not installed or not running
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Source ran but failed (query error, nonzero exit, spawn failure)
    #[error("source execution failed: {0}")]
    Execution(String),

    /// Source invocation exceeded its time budget
    #[error("source timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Check if the source itself was reachable when the error occurred
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}
