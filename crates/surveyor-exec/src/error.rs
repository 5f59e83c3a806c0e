//! Error types for surveyor-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while spawning and waiting on a command
///
/// A nonzero exit status is not an error at this layer; it is reported as
/// data on [`crate::result::CommandResult`] and classified by the caller.
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Process could not be spawned (missing shell, resource limits)
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error while waiting for the process or reading its output
    #[error("I/O error: {0}")]
    IoError(String),

    /// Command exceeded its time budget
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },
}

impl ExecError {
    /// Check if the error is a timeout; the script may still have produced
    /// partial effects before being killed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::Timeout { .. })
    }
}
