//! Captured output of a finished command

use std::time::Duration;

/// What a command left behind: exit status, captured streams, wall time
///
/// A nonzero exit is data here, not an error; the engine decides whether a
/// failed probe command matters.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Process exit code, `-1` when terminated by a signal
    pub status: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Wall-clock time the command took
    pub duration: Duration,
}

impl CommandResult {
    /// Exit status was zero
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Stdout with surrounding whitespace stripped, the form probe parsing
    /// works on
    #[must_use]
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    /// The command succeeded but printed nothing usable
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.success() && self.text().is_empty()
    }
}
