//! osquery-backed query engine

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use surveyor_exec::{ExecError, ShellExecutor};
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::source::QueryEngine;

/// Time budget for the availability probe; cheap, so kept short
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Query engine backed by the `osqueryi` one-shot shell
///
/// Results are never cached: repeated collection passes re-execute their
/// sources so identical inputs produce identical output with no hidden
/// state.
pub struct OsqueryEngine {
    /// Executor for running osqueryi
    executor: Arc<dyn ShellExecutor>,
    /// osqueryi binary name or path
    binary: String,
}

impl OsqueryEngine {
    /// Create a new engine using `osqueryi` from `PATH`
    pub fn new(executor: Arc<dyn ShellExecutor>) -> Self {
        Self {
            executor,
            binary: "osqueryi".to_string(),
        }
    }

    /// Override the osqueryi binary path
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl QueryEngine for OsqueryEngine {
    #[instrument(skip(self))]
    async fn is_available(&self) -> bool {
        let cmd = format!("which {}", self.binary);
        let result = self
            .executor
            .run_with_timeout(&cmd, AVAILABILITY_TIMEOUT)
            .await;
        result.is_ok_and(|r| r.success())
    }

    #[instrument(skip(self, sql), fields(query = %sql))]
    async fn execute_query(
        &self,
        sql: &str,
        timeout: Duration,
    ) -> Result<Vec<Value>, SourceError> {
        debug!("executing osquery");

        // Escape single quotes in SQL by replacing with '"'"'
        let cmd = format!(
            "{} --json '{}'",
            self.binary,
            sql.replace('\'', "'\"'\"'")
        );

        let result = self
            .executor
            .run_with_timeout(&cmd, timeout)
            .await
            .map_err(|e| match e {
                ExecError::Timeout { timeout } => SourceError::Timeout(timeout),
                other => SourceError::Execution(other.to_string()),
            })?;

        if !result.success() {
            // `sh -c` reports 127 when the binary is missing
            if result.status == 127 {
                return Err(SourceError::Unavailable(format!(
                    "{} not found on this system",
                    self.binary
                )));
            }
            if result.stderr.contains("no such table") {
                let table = extract_table_name(sql).unwrap_or_else(|| "unknown".to_string());
                return Err(SourceError::Execution(format!(
                    "table not available: {table}"
                )));
            }
            if result.stderr.contains("syntax error") {
                return Err(SourceError::Execution(format!(
                    "sql syntax error: {}",
                    result.stderr.trim()
                )));
            }
            return Err(SourceError::Execution(result.stderr.trim().to_string()));
        }

        // osqueryi --json emits a JSON array of row objects; a fully
        // silent run counts as zero rows
        if result.is_silent() {
            return Ok(Vec::new());
        }
        let rows: Vec<Value> = serde_json::from_str(result.text())
            .map_err(|e| SourceError::Execution(format!("unexpected osquery output: {e}")))?;

        debug!(rows = rows.len(), "query completed");

        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "osquery"
    }
}

/// Extract table name from SQL query (simple heuristic, for log messages)
fn extract_table_name(sql: &str) -> Option<String> {
    let sql_lower = sql.to_ascii_lowercase();
    let pos = sql_lower.find("from ")?;
    let after_from = &sql_lower[pos + 5..];
    let end = after_from
        .find(|c: char| c.is_whitespace() || c == ';')
        .unwrap_or(after_from.len());
    Some(after_from[..end].trim().to_string())
}
