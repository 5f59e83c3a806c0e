//! Report assembly

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::SerializeMap;
use surveyor_engine::{Module, ProbeRunner, SectionData};
use surveyor_exec::ShellExecutor;
use tracing::{info, warn};

/// One full collection run for this device
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub hostname: String,
    pub collected_at: DateTime<Utc>,
    pub modules: ReportSections,
}

impl DeviceReport {
    /// Collect every selected module and assemble the report
    ///
    /// Modules run one after another; the probes inside each run
    /// concurrently.
    pub async fn collect(
        runner: &ProbeRunner,
        shell: &dyn ShellExecutor,
        modules: &[Module],
    ) -> Self {
        let hostname = read_hostname(shell, runner.timeout()).await;

        let mut sections = ReportSections::default();
        for module in modules {
            info!(module = %module.id, probes = module.probes.len(), "collecting module");
            let section = module.collect(runner).await;
            sections.insert(module.id.clone(), section);
        }

        Self {
            hostname,
            collected_at: Utc::now(),
            modules: sections,
        }
    }
}

async fn read_hostname(shell: &dyn ShellExecutor, limit: Duration) -> String {
    match shell.run_with_timeout("hostname", limit).await {
        Ok(result) if result.success() => result.text().to_string(),
        Ok(result) => {
            warn!(status = result.status, "hostname lookup failed");
            String::new()
        }
        Err(e) => {
            warn!(error = %e, "hostname lookup failed");
            String::new()
        }
    }
}

/// Module sections in collection order
#[derive(Debug, Default)]
pub struct ReportSections {
    entries: Vec<(String, SectionData)>,
}

impl ReportSections {
    fn insert(&mut self, id: String, section: SectionData) {
        self.entries.push((id, section));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ReportSections {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, section) in &self.entries {
            map.serialize_entry(id, section)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use surveyor_engine::OsqueryEngine;
    use surveyor_exec::{CommandResult, ExecError, LocalExecutor};

    /// Executor whose commands never finish: only the deadline path returns.
    struct StuckShell;

    #[async_trait]
    impl ShellExecutor for StuckShell {
        async fn run(&self, _command: &str) -> Result<CommandResult, ExecError> {
            Ok(CommandResult {
                status: 0,
                stdout: "unbounded-host\n".to_string(),
                stderr: String::new(),
                duration: Duration::from_millis(1),
            })
        }

        async fn run_with_timeout(
            &self,
            _command: &str,
            limit: Duration,
        ) -> Result<CommandResult, ExecError> {
            Err(ExecError::Timeout { timeout: limit })
        }

        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    #[test]
    fn test_sections_serialize_in_collection_order() {
        let mut sections = ReportSections::default();
        sections.insert("system".to_string(), SectionData::new());
        sections.insert("security".to_string(), SectionData::new());

        let json = serde_json::to_string(&sections).unwrap();
        assert!(json.find("system").unwrap() < json.find("security").unwrap());
    }

    #[tokio::test]
    async fn test_report_shape_with_no_modules() {
        let executor = Arc::new(LocalExecutor::new());
        let engine = Arc::new(OsqueryEngine::new(executor.clone()));
        let runner = ProbeRunner::new(engine, executor.clone());

        let report = DeviceReport::collect(&runner, executor.as_ref(), &[]).await;

        let rendered = serde_json::to_value(&report).unwrap();
        assert!(rendered.get("hostname").is_some());
        assert!(rendered.get("collected_at").is_some());
        assert_eq!(rendered.get("modules").unwrap(), &serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_hostname_lookup_is_bounded() {
        let shell = Arc::new(StuckShell);
        let engine = Arc::new(OsqueryEngine::new(shell.clone()));
        let runner = ProbeRunner::new(engine, shell.clone());

        let report = DeviceReport::collect(&runner, shell.as_ref(), &[]).await;

        // StuckShell only answers on the unbounded path, so an empty
        // hostname proves the lookup went through the deadline one.
        assert_eq!(report.hostname, "");
    }
}
