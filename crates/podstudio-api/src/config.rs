//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `PODSTUDIO_*` environment variables. The binary applies command-line
//! flags last.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while assembling a [`ServerConfig`]
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigLoadError>;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_size: default_max_body_size(),
            request_timeout_ms: default_request_timeout_ms(),
            cors_enabled: true,
            metrics_enabled: true,
            json_logs: false,
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Defaults, overlaid with `path` when given, then with the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `PODSTUDIO_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PODSTUDIO_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Some(value) = parse_env(&lookup, "PODSTUDIO_MAX_BODY_SIZE")? {
            self.max_body_size = value;
        }
        if let Some(value) = parse_env(&lookup, "PODSTUDIO_REQUEST_TIMEOUT_MS")? {
            self.request_timeout_ms = value;
        }
        if let Some(value) = parse_env(&lookup, "PODSTUDIO_CORS_ENABLED")? {
            self.cors_enabled = value;
        }
        if let Some(value) = parse_env(&lookup, "PODSTUDIO_METRICS_ENABLED")? {
            self.metrics_enabled = value;
        }
        if let Some(value) = parse_env(&lookup, "PODSTUDIO_JSON_LOGS")? {
            self.json_logs = value;
        }
        if let Some(value) = lookup("PODSTUDIO_LOG_LEVEL") {
            self.log_level = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.max_body_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "max_body_size must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|_| {
            ConfigLoadError::Invalid(format!("bind_addr '{}' is not a socket address", self.bind_addr))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigLoadError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
    }
}
