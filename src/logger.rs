//! Centralized logging configuration and initialization manager.
//!
//! The `LoggerManager` validates logging configuration and initializes
//! the global `tracing` subscriber with a console layer writing to standard
//! error and an optional systemd journald layer. Standard output is never
//! used for diagnostics because it carries the status protocol.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically during journald socket operations.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald was the only requested output and it failed.
    #[error("Failed to initialize journald logger and console output is disabled")]
    JournaldFailedWithoutConsole,

    /// A global subscriber was already installed.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Initializes the global `tracing` subscriber with configured layers.
    ///
    /// Must be called once at startup before modules are spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if no layer can be created, if journald fails while
    /// it is the only enabled output, or if a subscriber is already set.
    pub fn init(&self) -> Result<(), LoggerError> {
        let layers = self.build_layers()?;

        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    fn build_layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if let Some(console_config) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.init_console_logger(console_config, self.filter()));
        }

        if let Some(journald_config) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.init_journald_logger(journald_config, self.filter()) {
                Ok(journald_layer) => {
                    layers.push(journald_layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald_config.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if layers.is_empty() {
                        return Err(LoggerError::JournaldFailedWithoutConsole);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }

        Ok(layers)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Constructs a console output layer according to the provided configuration.
    fn init_console_logger(&self, config: &ConsoleConfig, filter: EnvFilter) -> BoxedLayer {
        let writer = io::stderr;
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        }
    }

    /// Constructs a journald output layer tagged with the configured
    /// syslog identifier.
    fn init_journald_logger(
        &self,
        config: &JournaldConfig,
        filter: EnvFilter,
    ) -> Result<BoxedLayer, LoggerError> {
        let journald_layer =
            tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
        Ok(journald_layer.with_filter(filter).boxed())
    }
}
