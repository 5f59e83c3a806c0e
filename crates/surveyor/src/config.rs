//! Configuration loading and types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the surveyor agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-probe timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Module ids to collect; empty means all built-in modules
    #[serde(default)]
    pub modules: Vec<String>,
    /// Query source binary, for hosts with a nonstandard install
    #[serde(default = "default_osquery_binary")]
    pub osquery_binary: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timeout_secs: default_timeout_secs(),
            modules: Vec::new(),
            osquery_binary: default_osquery_binary(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_osquery_binary() -> String {
    "osqueryi".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &PathBuf) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the config file the agent would load by default
    ///
    /// `SURVEYOR_CONFIG` wins and is returned even when the file is
    /// missing, so a bad override fails loudly instead of being
    /// skipped. Otherwise the common locations are checked in order
    /// and `None` means no file was found.
    #[must_use]
    pub fn find_default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SURVEYOR_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let candidates = [
            PathBuf::from("surveyor.toml"),
            PathBuf::from("/etc/surveyor/surveyor.toml"),
            dirs::config_dir()
                .map(|p| p.join("surveyor/surveyor.toml"))
                .unwrap_or_default(),
        ];

        candidates.into_iter().find(|path| path.exists())
    }
}
