//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure that aggregates
//! logging and status line configuration. It handles loading from TOML files,
//! environment overrides, validation, and falls back to built-in defaults when
//! no configuration file exists.
//!
//! The configuration is loaded once before any module starts and is immutable
//! thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{logger::LoggerConfig, status::StatusConfig};

pub mod logger;
pub mod status;

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. Standard output carries the status protocol, so these write
/// to standard error.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::timestamp()).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::timestamp()).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::timestamp()).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// UTC timestamp used by the `print_*` macros.
#[doc(hidden)]
pub fn timestamp() -> String {
    let format = time::macros::format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_default()
}

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_ENV: &str = "LINEBAR_CONFIG";

/// Errors that can occur during configuration loading, parsing, validation,
/// or serialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Module list and aggregator timing.
    #[validate(nested)]
    pub status: StatusConfig,
}

impl Config {
    /// Locates and loads the configuration file, or returns defaults when
    /// none is present.
    ///
    /// An explicit path (from the command line) must exist.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the chosen file cannot be read, parsed,
    /// or validated.
    pub fn new(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::get_config_path() {
            Some(path) => Self::load(&path),
            None => {
                print_info!("No configuration file found, using built-in defaults");
                Ok(Config::default())
            }
        }
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `LINEBAR_CONFIG` environment variable
    /// 2. `$XDG_CONFIG_HOME/linebar/config.toml` (or `~/.config/linebar/config.toml`)
    /// 3. `/etc/linebar/config.toml`
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Some(path);
        }

        let user_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

        let candidates = user_dir
            .map(|dir| dir.join("linebar").join("config.toml"))
            .into_iter()
            .chain(std::iter::once(PathBuf::from("/etc/linebar/config.toml")));

        for candidate in candidates {
            if candidate.exists() {
                print_info!("Using config path: {}", candidate.display());
                return Some(candidate);
            }
        }

        None
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "file not found: {}",
                path.to_string_lossy()
            )));
        }

        let config_str = fs::read_to_string(path)?;
        let config = Self::parse(&config_str)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` or `ValidationError`.
    pub fn parse(config_str: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(config)
    }
}
