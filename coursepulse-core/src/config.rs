//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/coursepulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/coursepulse/` (~/.config/coursepulse/)
//! - Data: `$XDG_DATA_HOME/coursepulse/` (~/.local/share/coursepulse/)
//! - State/Logs: `$XDG_STATE_HOME/coursepulse/` (~/.local/state/coursepulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Analytics windows and limits
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database location override
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Analytics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Trailing window (days) for counting a student as active
    #[serde(default = "default_active_window_days")]
    pub active_window_days: u32,

    /// Trailing window (days) for class activity trends
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: u32,

    /// Number of recent activities returned in progress views
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            active_window_days: default_active_window_days(),
            trend_window_days: default_trend_window_days(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

fn default_active_window_days() -> u32 {
    30
}

fn default_trend_window_days() -> u32 {
    30
}

fn default_recent_activity_limit() -> usize {
    5
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Database configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Explicit database file; defaults to the XDG data dir
    pub path: Option<PathBuf>,
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.analytics.active_window_days == 0 {
            return Err(Error::Config(
                "analytics.active_window_days must be at least 1".to_string(),
            ));
        }
        if self.analytics.trend_window_days == 0 {
            return Err(Error::Config(
                "analytics.trend_window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/coursepulse/config.toml` (~/.config/coursepulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("coursepulse").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/coursepulse/` (~/.local/share/coursepulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("coursepulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/coursepulse/` (~/.local/state/coursepulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("coursepulse")
    }

    /// Returns the database file path, honoring `[database] path`
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// `$XDG_DATA_HOME/coursepulse/progress.db`
    pub fn default_database_path() -> PathBuf {
        Self::data_dir().join("progress.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/coursepulse/coursepulse.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("coursepulse.log")
    }

    /// Pin the XDG variables to their home-relative defaults when unset.
    ///
    /// Called by the CLI before anything reads these paths.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
