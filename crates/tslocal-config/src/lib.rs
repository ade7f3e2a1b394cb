#![deny(unsafe_code)]

//! Configuration loading and validation for tslocal.
//!
//! The client is driven by an explicit [`ClientConfig`]: socket location,
//! per-call timeout, the daemon CLI used as a fallback transport, and which
//! transport to prefer. Values come from a TOML file, from the two socket
//! environment variables, or from code; nothing reads the process
//! environment after construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variables consulted (in order) for the socket path.
pub const SOCKET_ENV_VARS: [&str; 2] = ["TAILSCALE_LOCALAPI_SOCKET", "TS_LOCALAPI_SOCKET"];

/// Socket path used when neither the config nor the environment names one.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level configuration file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LocalAPI client configuration.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which transport the client should use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPreference {
    /// Pick by host platform.
    #[default]
    Auto,
    /// Always talk HTTP over the Unix socket.
    Socket,
    /// Always shell out to the daemon CLI.
    Cli,
}

impl FromStr for TransportPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "socket" => Ok(Self::Socket),
            "cli" => Ok(Self::Cli),
            other => Err(ConfigError::Validation(format!(
                "transport must be one of \"auto\", \"socket\", \"cli\", got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for TransportPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Socket => "socket",
            Self::Cli => "cli",
        })
    }
}

/// LocalAPI client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Explicit socket path. When unset, [`ClientConfig::with_env_lookup`]
    /// fills it from the environment, and [`DEFAULT_SOCKET_PATH`] is the
    /// last resort.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Daemon CLI program used by the subprocess transport.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// Transport preference.
    #[serde(default)]
    pub transport: TransportPreference,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            timeout_ms: default_timeout_ms(),
            cli_path: default_cli_path(),
            transport: TransportPreference::default(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_cli_path() -> String {
    "tailscale".to_string()
}

impl ClientConfig {
    /// Default configuration with the socket path taken from the process
    /// environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Default configuration with the socket path taken from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_env_lookup(lookup)
    }

    /// Fill an unset socket path from the first non-empty entry of
    /// [`SOCKET_ENV_VARS`]. An explicit path is left alone.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.socket_path.is_none() {
            self.socket_path = SOCKET_ENV_VARS
                .iter()
                .filter_map(|&key| lookup(key))
                .find(|value| !value.is_empty())
                .map(PathBuf::from);
        }
        self
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Set the per-call timeout, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_cli_path(mut self, program: impl Into<String>) -> Self {
        self.cli_path = program.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportPreference) -> Self {
        self.transport = transport;
        self
    }

    /// The socket the direct transport connects to.
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the client section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "client.timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.cli_path.is_empty() {
            return Err(ConfigError::Validation(
                "client.cli_path must not be empty".to_string(),
            ));
        }
        if self
            .socket_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::Validation(
                "client.socket_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }
        Ok(())
    }
}
