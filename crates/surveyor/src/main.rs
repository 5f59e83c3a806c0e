//! surveyor agent
//!
//! Collects device facts through declarative probe modules and emits one
//! JSON report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::bail;
use surveyor_engine::{Module, OsqueryEngine, ProbeRunner};
use surveyor_exec::LocalExecutor;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod report;

use config::Config;
use report::DeviceReport;

#[derive(Parser)]
#[command(name = "surveyor")]
#[command(about = "Endpoint fact collection agent", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Module ids to collect, comma separated (default: all built-in)
    #[arg(short, long, value_delimiter = ',')]
    modules: Vec<String>,

    /// Per-probe timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// List available modules and exit
    #[arg(long)]
    list_modules: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::find_default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Logs go to stderr; the report owns stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.agent.log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &config_path {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => warn!("no config file found, using defaults"),
    }

    if cli.list_modules {
        for module in surveyor_modules::catalog() {
            println!("{}", module.id);
        }
        return Ok(());
    }

    let selected = select_modules(&cli.modules, &config)?;
    let timeout = Duration::from_secs(cli.timeout_secs.unwrap_or(config.agent.timeout_secs));
    debug!(modules = selected.len(), timeout_secs = timeout.as_secs(), "configured");

    let executor = Arc::new(LocalExecutor::new());
    let engine = Arc::new(
        OsqueryEngine::new(executor.clone()).with_binary(config.agent.osquery_binary.clone()),
    );
    let runner = ProbeRunner::new(engine, executor.clone()).with_timeout(timeout);

    info!(modules = selected.len(), "starting collection");
    let report = DeviceReport::collect(&runner, executor.as_ref(), &selected).await;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match &cli.output {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }

    info!("collection finished");
    Ok(())
}

/// Resolve the module selection: CLI flags beat config, empty means all
fn select_modules(requested: &[String], config: &Config) -> Result<Vec<Module>> {
    let wanted = if requested.is_empty() {
        &config.agent.modules
    } else {
        requested
    };

    if wanted.is_empty() {
        return Ok(surveyor_modules::catalog());
    }

    let mut selected = Vec::with_capacity(wanted.len());
    for id in wanted {
        match surveyor_modules::by_id(id) {
            Some(module) => selected.push(module),
            None => bail!("unknown module '{id}'"),
        }
    }
    Ok(selected)
}
