use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use surveyor_engine::*;
use surveyor_exec::error::ExecError;
use surveyor_exec::result::CommandResult;
use surveyor_exec::traits::ShellExecutor;

// Mock implementations

enum QueryOutcome {
    Rows(Vec<Value>),
    Fail(String),
}

struct MockEngine {
    available: bool,
    responses: HashMap<String, QueryOutcome>,
    calls: AtomicUsize,
}

impl MockEngine {
    fn new(available: bool) -> Self {
        Self {
            available,
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn rows(mut self, sql: &str, rows: Vec<Value>) -> Self {
        self.responses
            .insert(sql.to_string(), QueryOutcome::Rows(rows));
        self
    }

    fn failing(mut self, sql: &str, msg: &str) -> Self {
        self.responses
            .insert(sql.to_string(), QueryOutcome::Fail(msg.to_string()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn execute_query(
        &self,
        sql: &str,
        _timeout: Duration,
    ) -> Result<Vec<Value>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(sql) {
            Some(QueryOutcome::Rows(rows)) => Ok(rows.clone()),
            Some(QueryOutcome::Fail(msg)) => Err(SourceError::Execution(msg.clone())),
            None => Err(SourceError::Execution(format!("unexpected query: {sql}"))),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

enum ShellOutcome {
    Output(&'static str),
    Exit(i32, &'static str, &'static str),
    Delayed(Duration, &'static str),
    Panic,
    Fail,
}

struct MockShell {
    outcomes: HashMap<String, ShellOutcome>,
    calls: AtomicUsize,
}

impl MockShell {
    fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn on(mut self, cmd: &str, outcome: ShellOutcome) -> Self {
        self.outcomes.insert(cmd.to_string(), outcome);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn result(status: i32, stdout: &str, stderr: &str) -> CommandResult {
        CommandResult {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl ShellExecutor for MockShell {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.get(cmd) {
            Some(ShellOutcome::Output(stdout)) => Ok(Self::result(0, stdout, "")),
            Some(ShellOutcome::Exit(status, stdout, stderr)) => {
                Ok(Self::result(*status, stdout, stderr))
            }
            Some(ShellOutcome::Delayed(delay, stdout)) => {
                tokio::time::sleep(*delay).await;
                Ok(Self::result(0, stdout, ""))
            }
            Some(ShellOutcome::Panic) => panic!("mock shell panic"),
            Some(ShellOutcome::Fail) => Err(ExecError::SpawnError("mock failure".to_string())),
            None => Ok(Self::result(127, "", "command not found")),
        }
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        match tokio::time::timeout(timeout, self.run(cmd)).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Timeout { timeout }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn runner(engine: Arc<MockEngine>, shell: Arc<MockShell>) -> ProbeRunner {
    ProbeRunner::new(engine, shell)
}

// Fallback ladder

#[tokio::test]
async fn test_single_record_query_resolves_fields() {
    let engine = Arc::new(MockEngine::new(true).rows(
        "SELECT version, patch FROM os_version",
        vec![json!({"version": "24.04", "patch": "2"})],
    ));
    let shell = Arc::new(MockShell::new());
    let runner = runner(engine, shell.clone());

    let probe = Probe::new("os_version")
        .with_query("SELECT version, patch FROM os_version")
        .with_script("lsb_release -r")
        .field(FieldSpec::new("version", FieldKind::Text))
        .field(FieldSpec::new("patch", FieldKind::Int));

    let bundle = runner.collect(&probe).await;

    assert_eq!(
        bundle.get("version"),
        Some(&FactValue::Text("24.04".to_string()))
    );
    assert_eq!(bundle.get("patch"), Some(&FactValue::Int(2)));
    assert_eq!(shell.calls(), 0);
}

#[tokio::test]
async fn test_multi_row_query_wraps_as_rows() {
    let engine = Arc::new(MockEngine::new(true).rows(
        "SELECT name FROM processes",
        vec![json!({"name": "init"}), json!({"name": "sshd"})],
    ));
    let shell = Arc::new(MockShell::new());
    let runner = runner(engine, shell);

    let probe = Probe::new("processes")
        .with_query("SELECT name FROM processes")
        .field(FieldSpec::new("items", FieldKind::Rows));

    let bundle = runner.collect(&probe).await;

    match bundle.get("items") {
        Some(FactValue::Rows(rows)) => assert_eq!(rows.len(), 2),
        other => panic!("unexpected value: {other:?}"),
    }
}

#[tokio::test]
async fn test_single_non_object_row_wraps_as_rows() {
    let engine = Arc::new(MockEngine::new(true).rows("SELECT 1", vec![json!(1)]));
    let shell = Arc::new(MockShell::new());
    let runner = runner(engine, shell);

    let probe = Probe::new("one").with_query("SELECT 1");
    let raw = runner.resolve(&probe).await;

    assert_eq!(raw, RawValue::Rows(vec![json!(1)]));
}

#[tokio::test]
async fn test_zero_rows_triggers_shell_fallback() {
    let engine = Arc::new(MockEngine::new(true).rows("SELECT * FROM stub", vec![]));
    let shell = Arc::new(
        MockShell::new().on("probe-tool --json", ShellOutcome::Output(r#"{"state": "ok"}"#)),
    );
    let runner = runner(engine.clone(), shell.clone());

    let probe = Probe::new("stub")
        .with_query("SELECT * FROM stub")
        .with_script("probe-tool --json")
        .field(FieldSpec::new("state", FieldKind::Text));

    let bundle = runner.collect(&probe).await;

    assert_eq!(engine.calls(), 1);
    assert_eq!(shell.calls(), 1);
    assert_eq!(bundle.get("state"), Some(&FactValue::Text("ok".to_string())));
}

#[tokio::test]
async fn test_unavailable_source_skips_query_entirely() {
    let engine = Arc::new(MockEngine::new(false));
    let shell =
        Arc::new(MockShell::new().on("uname -r", ShellOutcome::Output("6.8.0-40-generic\n")));
    let runner = runner(engine.clone(), shell);

    let probe = Probe::new("kernel")
        .with_query("SELECT version FROM kernel_info")
        .with_script("uname -r")
        .field(FieldSpec::new("version", FieldKind::Text).alias("output"));

    let bundle = runner.collect(&probe).await;

    assert_eq!(engine.calls(), 0);
    assert_eq!(
        bundle.get("version"),
        Some(&FactValue::Text("6.8.0-40-generic".to_string()))
    );
}

#[tokio::test]
async fn test_query_error_falls_back_to_shell() {
    let engine =
        Arc::new(MockEngine::new(true).failing("SELECT * FROM broken", "table not available"));
    let shell = Arc::new(MockShell::new().on("fallback", ShellOutcome::Output(r#"{"n": 3}"#)));
    let runner = runner(engine, shell);

    let probe = Probe::new("broken")
        .with_query("SELECT * FROM broken")
        .with_script("fallback")
        .field(FieldSpec::new("n", FieldKind::Int));

    let bundle = runner.collect(&probe).await;
    assert_eq!(bundle.get("n"), Some(&FactValue::Int(3)));
}

#[tokio::test]
async fn test_shell_array_output_lands_under_items() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new().on(
        "list-units",
        ShellOutcome::Output(r#"[{"unit": "ssh"}, {"unit": "cron"}]"#),
    ));
    let runner = runner(engine, shell);

    let probe = Probe::new("units")
        .with_script("list-units")
        .field(FieldSpec::new("units", FieldKind::Rows).alias("items"));

    let bundle = runner.collect(&probe).await;

    assert_eq!(
        bundle.get("units"),
        Some(&FactValue::Rows(vec![
            json!({"unit": "ssh"}),
            json!({"unit": "cron"})
        ]))
    );
}

#[tokio::test]
async fn test_empty_query_then_shell_array_yields_both_rows() {
    let engine = Arc::new(MockEngine::new(true).rows("SELECT * FROM agents", vec![]));
    let shell = Arc::new(MockShell::new().on(
        "scan-agents",
        ShellOutcome::Output(r#"[{"agent": "a"}, {"agent": "b"}]"#),
    ));
    let runner = runner(engine, shell);

    let probe = Probe::new("agents")
        .with_query("SELECT * FROM agents")
        .with_script("scan-agents")
        .field(FieldSpec::new("items", FieldKind::Rows));

    let bundle = runner.collect(&probe).await;

    match bundle.get("items") {
        Some(FactValue::Rows(rows)) => {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0], json!({"agent": "a"}));
            assert_eq!(rows[1], json!({"agent": "b"}));
        }
        other => panic!("unexpected value: {other:?}"),
    }
}

#[tokio::test]
async fn test_shell_scalar_array_kept_as_rows() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new().on("names", ShellOutcome::Output(r#"["a", "b"]"#)));
    let runner = runner(engine, shell);

    let probe = Probe::new("names")
        .with_script("names")
        .field(FieldSpec::new("items", FieldKind::Rows));

    let bundle = runner.collect(&probe).await;
    assert_eq!(
        bundle.get("items"),
        Some(&FactValue::Rows(vec![json!("a"), json!("b")]))
    );
}

#[tokio::test]
async fn test_shell_text_output_lands_under_output() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new().on("svc-state", ShellOutcome::Output("active\n")));
    let runner = runner(engine, shell);

    let probe = Probe::new("service")
        .with_script("svc-state")
        .field(FieldSpec::new("state", FieldKind::Text).alias("output"));

    let bundle = runner.collect(&probe).await;
    assert_eq!(
        bundle.get("state"),
        Some(&FactValue::Text("active".to_string()))
    );
}

#[tokio::test]
async fn test_shell_nonzero_exit_falls_through() {
    let engine = Arc::new(MockEngine::new(false));
    let shell =
        Arc::new(MockShell::new().on("flaky", ShellOutcome::Exit(3, "partial", "boom")));
    let runner = runner(engine, shell);

    let probe = Probe::new("flaky")
        .with_script("flaky")
        .field(FieldSpec::new("state", FieldKind::Text).alias("output"));

    let bundle = runner.collect(&probe).await;
    assert_eq!(bundle.get("state"), Some(&FactValue::Text(String::new())));
}

#[tokio::test]
async fn test_exhaustion_after_empty_query_is_empty_rows() {
    let engine = Arc::new(MockEngine::new(true).rows("SELECT * FROM stub", vec![]));
    let shell = Arc::new(MockShell::new().on("also-broken", ShellOutcome::Exit(1, "", "")));
    let runner = runner(engine, shell);

    let probe = Probe::new("stub")
        .with_query("SELECT * FROM stub")
        .with_script("also-broken");

    let raw = runner.resolve(&probe).await;
    assert_eq!(raw, RawValue::Rows(Vec::new()));
}

#[tokio::test]
async fn test_exhaustion_without_query_is_plain_empty() {
    let engine = Arc::new(MockEngine::new(true));
    let shell = Arc::new(MockShell::new().on("broken", ShellOutcome::Fail));
    let runner = runner(engine, shell);

    let probe = Probe::new("shell_only").with_script("broken");

    let raw = runner.resolve(&probe).await;
    assert_eq!(raw, RawValue::Empty);
}

#[tokio::test]
async fn test_exhausted_probe_gets_full_defaults() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new());
    let runner = runner(engine, shell);

    let probe = Probe::new("ghost")
        .with_query("SELECT * FROM nope")
        .with_script("missing-tool")
        .field(FieldSpec::new("enabled", FieldKind::Bool))
        .field(FieldSpec::new("count", FieldKind::Int))
        .field(FieldSpec::new("seen", FieldKind::Timestamp))
        .field(FieldSpec::new("name", FieldKind::Text))
        .field(FieldSpec::new("items", FieldKind::Rows));

    let bundle = runner.collect(&probe).await;
    assert_eq!(bundle, FactBundle::defaults_for(&probe));
    assert_eq!(bundle.len(), 5);
}

#[tokio::test]
async fn test_slow_script_times_out_to_defaults() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new().on(
        "slow-tool",
        ShellOutcome::Delayed(Duration::from_secs(5), "too late"),
    ));
    let runner = runner(engine, shell).with_timeout(Duration::from_millis(20));

    let probe = Probe::new("slow")
        .with_script("slow-tool")
        .field(FieldSpec::new("state", FieldKind::Text).alias("output"));

    let bundle = runner.collect(&probe).await;
    assert_eq!(bundle.get("state"), Some(&FactValue::Text(String::new())));
}

#[tokio::test]
async fn test_collection_is_idempotent() {
    let engine = Arc::new(MockEngine::new(true).rows(
        "SELECT version FROM os_version",
        vec![json!({"version": "24.04"})],
    ));
    let shell = Arc::new(MockShell::new().on("count-pkgs", ShellOutcome::Output("1523\n")));
    let runner = runner(engine, shell);

    let probes = vec![
        Probe::new("os_version")
            .with_query("SELECT version FROM os_version")
            .field(FieldSpec::new("version", FieldKind::Text)),
        Probe::new("package_count")
            .with_script("count-pkgs")
            .field(FieldSpec::new("count", FieldKind::Int).alias("output")),
    ];

    let first = runner.collect_all(&probes, &CancelFlag::new()).await;
    let second = runner.collect_all(&probes, &CancelFlag::new()).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// Aggregation

#[tokio::test]
async fn test_aggregator_isolates_probe_failures() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(
        MockShell::new()
            .on("ok-one", ShellOutcome::Output(r#"{"n": 1}"#))
            .on("broken", ShellOutcome::Fail)
            .on("ok-two", ShellOutcome::Output(r#"{"n": 2}"#)),
    );
    let runner = runner(engine, shell);

    let probes = vec![
        Probe::new("first")
            .with_script("ok-one")
            .field(FieldSpec::new("n", FieldKind::Int)),
        Probe::new("second")
            .with_script("broken")
            .field(FieldSpec::new("n", FieldKind::Int)),
        Probe::new("third")
            .with_script("ok-two")
            .field(FieldSpec::new("n", FieldKind::Int)),
    ];

    let section = runner.collect_all(&probes, &CancelFlag::new()).await;

    assert_eq!(section.len(), 3);
    assert_eq!(
        section.get("first").unwrap().get("n"),
        Some(&FactValue::Int(1))
    );
    assert_eq!(
        section.get("second").unwrap().get("n"),
        Some(&FactValue::Int(0))
    );
    assert_eq!(
        section.get("third").unwrap().get("n"),
        Some(&FactValue::Int(2))
    );
}

#[tokio::test]
async fn test_aggregator_isolates_panics() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(
        MockShell::new()
            .on("fine", ShellOutcome::Output(r#"{"n": 7}"#))
            .on("explodes", ShellOutcome::Panic),
    );
    let runner = runner(engine, shell);

    let probes = vec![
        Probe::new("steady")
            .with_script("fine")
            .field(FieldSpec::new("n", FieldKind::Int)),
        Probe::new("volatile")
            .with_script("explodes")
            .field(FieldSpec::new("n", FieldKind::Int)),
    ];

    let section = runner.collect_all(&probes, &CancelFlag::new()).await;

    assert_eq!(section.len(), 2);
    assert_eq!(
        section.get("steady").unwrap().get("n"),
        Some(&FactValue::Int(7))
    );
    assert_eq!(
        section.get("volatile").unwrap().get("n"),
        Some(&FactValue::Int(0))
    );
}

#[tokio::test]
async fn test_aggregator_preserves_declared_order() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(
        MockShell::new()
            .on(
                "slowest",
                ShellOutcome::Delayed(Duration::from_millis(50), r#"{"n": 1}"#),
            )
            .on(
                "slower",
                ShellOutcome::Delayed(Duration::from_millis(20), r#"{"n": 2}"#),
            )
            .on("instant", ShellOutcome::Output(r#"{"n": 3}"#)),
    );
    let runner = runner(engine, shell);

    let probes = vec![
        Probe::new("alpha")
            .with_script("slowest")
            .field(FieldSpec::new("n", FieldKind::Int)),
        Probe::new("beta")
            .with_script("slower")
            .field(FieldSpec::new("n", FieldKind::Int)),
        Probe::new("gamma")
            .with_script("instant")
            .field(FieldSpec::new("n", FieldKind::Int)),
    ];

    let section = runner.collect_all(&probes, &CancelFlag::new()).await;

    let keys: Vec<&String> = section.iter().map(|(id, _)| id).collect();
    assert_eq!(keys, ["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn test_cancelled_probes_never_launch() {
    let engine = Arc::new(MockEngine::new(true));
    let shell = Arc::new(MockShell::new().on("anything", ShellOutcome::Output("hi")));
    let runner = runner(engine.clone(), shell.clone());

    let probes = vec![
        Probe::new("one")
            .with_script("anything")
            .field(FieldSpec::new("state", FieldKind::Text).alias("output")),
        Probe::new("two")
            .with_script("anything")
            .field(FieldSpec::new("state", FieldKind::Text).alias("output")),
    ];

    let cancel = CancelFlag::new();
    cancel.cancel();
    let section = runner.collect_all(&probes, &cancel).await;

    assert_eq!(section.len(), 2);
    assert_eq!(engine.calls(), 0);
    assert_eq!(shell.calls(), 0);
    for (_, bundle) in section.iter() {
        assert_eq!(
            bundle.get("state"),
            Some(&FactValue::Text(String::new()))
        );
    }
}

// Modules

#[tokio::test]
async fn test_module_appends_derived_summary() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(
        MockShell::new()
            .on("agent-state", ShellOutcome::Output(r#"{"running": "1"}"#))
            .on("issue-scan", ShellOutcome::Output(r#"{"errors": 0, "warnings": 2}"#)),
    );
    let runner = runner(engine, shell);

    let module = Module::new("security")
        .probe(
            Probe::new("service")
                .with_script("agent-state")
                .field(FieldSpec::new("running", FieldKind::Bool)),
        )
        .probe(
            Probe::new("issues")
                .with_script("issue-scan")
                .field(FieldSpec::new("errors", FieldKind::Int))
                .field(FieldSpec::new("warnings", FieldKind::Int)),
        )
        .with_summary(
            SummarySpec::new("summary", "inactive")
                .rule("issues", "errors", FieldTest::NonZero, "error")
                .rule("issues", "warnings", FieldTest::NonZero, "warning")
                .rule("service", "running", FieldTest::IsTrue, "active")
                .overlay("issues", "warnings", "warning_count"),
        );

    let section = module.collect(&runner).await;

    assert_eq!(section.len(), 3);
    let keys: Vec<&String> = section.iter().map(|(id, _)| id).collect();
    assert_eq!(keys, ["service", "issues", "summary"]);

    let summary = section.get("summary").unwrap();
    assert_eq!(
        summary.get("status"),
        Some(&FactValue::Text("warning".to_string()))
    );
    assert_eq!(summary.get("warning_count"), Some(&FactValue::Int(2)));
}

#[tokio::test]
async fn test_module_without_summary_keeps_probe_entries_only() {
    let engine = Arc::new(MockEngine::new(false));
    let shell = Arc::new(MockShell::new().on("hostname", ShellOutcome::Output("web-01\n")));
    let runner = runner(engine, shell);

    let module = Module::new("system").probe(
        Probe::new("host")
            .with_script("hostname")
            .field(FieldSpec::new("name", FieldKind::Text).alias("output")),
    );

    let section = module.collect(&runner).await;

    assert_eq!(section.len(), 1);
    assert_eq!(
        section.get("host").unwrap().get("name"),
        Some(&FactValue::Text("web-01".to_string()))
    );
}
