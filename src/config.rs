//! Optional `config.toml` for composescope
//!
//! ```toml
//! [telemetry]
//! enabled = true
//! endpoint = "http://127.0.0.1:9119/usage"
//! timeout_ms = 500
//! commands = ["deploy"]
//! management_commands = ["cloud"]
//! command_flags = ["--debug"]
//!
//! [logs]
//! namespace = "shop"
//! tail = 100
//! timestamps = false
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use composescope_metrics::{CommandSet, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, HttpTelemetryClient};

/// Errors loading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,

    /// Extra top-level command names
    pub commands: Vec<String>,

    /// Extra command group names
    pub management_commands: Vec<String>,

    /// Extra telemetry-significant flags
    pub command_flags: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            commands: Vec::new(),
            management_commands: Vec::new(),
            command_flags: Vec::new(),
        }
    }
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Built-in reference sets extended with the configured names
    pub fn command_set(&self) -> CommandSet {
        CommandSet::default()
            .with_commands(self.commands.iter().cloned())
            .with_management_commands(self.management_commands.iter().cloned())
            .with_command_flags(self.command_flags.iter().cloned())
    }

    /// The HTTP client, or `None` when telemetry is off
    pub fn http_client(&self) -> Option<Arc<HttpTelemetryClient>> {
        self.enabled
            .then(|| Arc::new(HttpTelemetryClient::new(self.endpoint.clone(), self.timeout())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Namespace to read from when the context sets none
    pub namespace: Option<String>,

    /// Historical lines per container
    pub tail: Option<i64>,

    pub timestamps: bool,
}

impl Config {
    /// Default location: `~/.composescope/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".composescope").join("config.toml"))
    }

    /// Load from an explicit path, or from the default path if it exists
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Defaults with usage telemetry switched off
    pub fn without_telemetry() -> Self {
        let mut config = Self::default();
        config.telemetry.enabled = false;
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
