//! Shell executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Process-execution capability used by probe shell sources
///
/// Implementations spawn a command, wait for it, and return captured
/// output. Callers are expected to prefer
/// [`ShellExecutor::run_with_timeout`] so a stuck command cannot stall a
/// whole collection pass.
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    /// Run a command and capture its output
    async fn run(&self, command: &str) -> Result<CommandResult, ExecError>;

    /// Run a command under a bounded time budget
    async fn run_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short name for log lines ("local", "mock", ...)
    fn name(&self) -> &'static str;
}
