//! Probe orchestration
//!
//! `ProbeRunner` drives a probe through its source ladder: the structured
//! query source when the probe declares a query and the source is present,
//! then the shell fallback, then empty. Source failures at any rung are
//! degradation, not errors, so the runner's surface never returns `Result`
//! for collection itself.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use surveyor_exec::ShellExecutor;
use tracing::{debug, error, instrument, warn};

use crate::aggregator::{CancelFlag, SectionData};
use crate::normalize::{FactBundle, normalize};
use crate::probe::Probe;
use crate::raw::RawValue;
use crate::source::QueryEngine;

/// Default per-invocation timeout for queries and scripts
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback-driving probe executor
///
/// Cloning is cheap; clones share the underlying sources.
#[derive(Clone)]
pub struct ProbeRunner {
    query: Arc<dyn QueryEngine>,
    shell: Arc<dyn ShellExecutor>,
    timeout: Duration,
}

impl ProbeRunner {
    /// Create a runner over a query source and a shell fallback
    pub fn new(query: Arc<dyn QueryEngine>, shell: Arc<dyn ShellExecutor>) -> Self {
        Self {
            query,
            shell,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-invocation timeout applied to every query and script
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-invocation timeout currently in effect
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one probe down its source ladder and return the raw outcome
    ///
    /// A zero-row query result is ambiguous (genuinely empty, or the table
    /// is a stub), so the shell fallback still runs; if that also produces
    /// nothing, the ambiguity is preserved as an empty row list rather
    /// than plain emptiness.
    pub async fn resolve(&self, probe: &Probe) -> RawValue {
        let mut ambiguous_empty = false;

        if let Some(sql) = &probe.query {
            if self.query.is_available().await {
                match self.query.execute_query(sql, self.timeout).await {
                    Ok(rows) if rows.is_empty() => {
                        ambiguous_empty = true;
                        debug!(probe = %probe.id, "query returned no rows, trying fallback");
                    }
                    Ok(mut rows) if rows.len() == 1 => {
                        return match rows.remove(0) {
                            Value::Object(record) => RawValue::Record(record),
                            other => RawValue::Rows(vec![other]),
                        };
                    }
                    Ok(rows) => return RawValue::Rows(rows),
                    Err(e) => {
                        debug!(probe = %probe.id, error = %e, "query source failed, trying fallback");
                    }
                }
            } else {
                debug!(probe = %probe.id, source = self.query.name(), "query source unavailable");
            }
        }

        if let Some(script) = &probe.script {
            match self.shell.run_with_timeout(script, self.timeout).await {
                Ok(result) if result.is_silent() => {
                    debug!(probe = %probe.id, "script produced no output");
                }
                Ok(result) if result.success() => {
                    return parse_script_output(result.text());
                }
                Ok(result) => {
                    debug!(probe = %probe.id, status = result.status, "script exited nonzero");
                }
                Err(e) => {
                    debug!(probe = %probe.id, error = %e, "script execution failed");
                }
            }
        }

        if ambiguous_empty {
            RawValue::Rows(Vec::new())
        } else {
            RawValue::Empty
        }
    }

    /// Resolve a probe and normalize the outcome into its declared fields
    #[instrument(skip(self, probe), fields(probe = %probe.id))]
    pub async fn collect(&self, probe: &Probe) -> FactBundle {
        let raw = self.resolve(probe).await;
        debug!(shape = raw.kind(), "probe resolved");
        normalize(probe, raw)
    }

    /// Collect a group of probes concurrently
    ///
    /// Each probe runs on its own task; results land in the section in
    /// declared order regardless of completion order. A panicked or
    /// cancelled probe contributes its all-defaults bundle so the section
    /// shape stays stable.
    pub async fn collect_all(&self, probes: &[Probe], cancel: &CancelFlag) -> SectionData {
        let mut handles = Vec::with_capacity(probes.len());

        for probe in probes {
            if cancel.is_cancelled() {
                warn!(probe = %probe.id, "cancelled before launch, using defaults");
                handles.push((probe.clone(), None));
                continue;
            }

            let runner = self.clone();
            let task_probe = probe.clone();
            let handle = tokio::spawn(async move { runner.collect(&task_probe).await });
            handles.push((probe.clone(), Some(handle)));
        }

        let mut section = SectionData::new();
        for (probe, handle) in handles {
            let bundle = match handle {
                Some(handle) => match handle.await {
                    Ok(bundle) => bundle,
                    Err(e) => {
                        error!(probe = %probe.id, error = %e, "probe task panicked");
                        FactBundle::defaults_for(&probe)
                    }
                },
                None => FactBundle::defaults_for(&probe),
            };
            section.insert(probe.id.clone(), bundle);
        }

        section
    }
}

/// Classify successful script stdout by shape
fn parse_script_output(text: &str) -> RawValue {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(record)) => RawValue::Record(record),
        Ok(Value::Array(rows)) => RawValue::Rows(rows),
        _ => RawValue::Text(text.to_string()),
    }
}
