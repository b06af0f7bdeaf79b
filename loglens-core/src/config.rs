//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/loglens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/loglens/` (~/.config/loglens/)
//! - Data: `$XDG_DATA_HOME/loglens/` (~/.local/share/loglens/)
//! - State/Logs: `$XDG_STATE_HOME/loglens/` (~/.local/state/loglens/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Ingest server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Accumulator flush configuration
    #[serde(default)]
    pub accumulator: AccumulatorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ingest server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the ingest listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:5555".to_string()
}

/// Accumulator flush configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AccumulatorConfig {
    /// Seconds between periodic flushes
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Appended-record count that triggers an immediate flush
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
            flush_threshold: default_flush_threshold(),
        }
    }
}

fn default_flush_interval() -> u64 {
    30
}

fn default_flush_threshold() -> usize {
    100
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/loglens/config.toml` (~/.config/loglens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("loglens").join("config.toml")
    }

    /// Returns the data directory path (settings and persisted batches)
    ///
    /// `$XDG_DATA_HOME/loglens/` (~/.local/share/loglens/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("loglens")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/loglens/` (~/.local/state/loglens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("loglens")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/loglens/loglens.log` (~/.local/state/loglens/loglens.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("loglens.log")
    }
}
