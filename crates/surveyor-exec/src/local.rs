//! Local command execution using `tokio::process`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::ShellExecutor;

/// Runs probe commands on the endpoint itself
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self), level = "debug")]
    async fn execute(&self, command: &str) -> Result<CommandResult, ExecError> {
        let started = Instant::now();

        debug!(command = %command, "spawning shell");

        // Probe commands lean on pipes and redirection, so everything goes
        // through sh. kill_on_drop: a command abandoned at its deadline
        // must not outlive the collection pass.
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: started.elapsed(),
        };

        if result.success() {
            debug!(command = %command, duration = ?result.duration, "command completed");
        } else {
            // Nonzero exit is routine for fallback probes; the engine
            // decides what it means, so keep this quiet.
            debug!(
                command = %command,
                status = result.status,
                stderr = %result.stderr.trim(),
                "command exited nonzero"
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl ShellExecutor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn run(&self, command: &str) -> Result<CommandResult, ExecError> {
        self.execute(command).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn run_with_timeout(
        &self,
        command: &str,
        limit: Duration,
    ) -> Result<CommandResult, ExecError> {
        match timeout(limit, self.execute(command)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(command = %command, limit = ?limit, "command hit its time budget, killed");
                Err(ExecError::Timeout { timeout: limit })
            }
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
