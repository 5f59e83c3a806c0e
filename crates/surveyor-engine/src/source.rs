//! Probe source contracts
//!
//! The engine speaks to its two data sources through traits: the
//! structured-query contract below, and [`surveyor_exec::ShellExecutor`]
//! for shell fallbacks. Mocks implement the same traits in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;

/// Structured tabular query capability
///
/// The engine is queried repeatedly but never held across calls; it is
/// expected to serialize its own concurrent access.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Check whether the engine is present and runnable
    async fn is_available(&self) -> bool;

    /// Execute query text, returning zero or more JSON records
    ///
    /// A zero-row result is valid and deliberately ambiguous: the table may
    /// be empty, or the table may not be registered yet.
    ///
    /// # Errors
    /// Returns [`SourceError`] if the engine is missing, the query fails,
    /// or the invocation exceeds `timeout`.
    async fn execute_query(
        &self,
        sql: &str,
        timeout: Duration,
    ) -> Result<Vec<Value>, SourceError>;

    /// Short name for log lines ("osquery", "mock", ...)
    fn name(&self) -> &'static str;
}
