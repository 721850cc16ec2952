//! Configuration structures for the status line modules and aggregator timing.
//!
//! This module defines which modules are activated, in which order they
//! appear in the output, the per-module options passed to their factories,
//! and the debounce window applied by the aggregator.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default capacity in bytes of a module's rendered text.
pub const DEFAULT_CAPACITY: usize = 256;

/// A single activated module and the options handed to its factory.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Name of the module. Used both to look up the implementation in the
    /// module catalog and as the `name` key of the emitted JSON object.
    #[validate(length(min = 1, message = "Module name must not be empty"))]
    pub name: String,

    /// Sampling interval in seconds for interval-driven modules.
    #[serde(default)]
    #[validate(range(min = 1, message = "Module interval must be at least 1 second"))]
    pub interval_secs: Option<u64>,

    /// Filesystem path the module reads or watches, if it needs one.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Command line the module runs, if it spawns a subprocess.
    #[serde(default)]
    pub command: Option<String>,

    /// Capacity in bytes of the rendered text. Longer renders are truncated.
    #[serde(default)]
    #[validate(range(min = 8, max = 4096, message = "Capacity must be between 8 and 4096 bytes"))]
    pub capacity: Option<usize>,
}

impl ModuleConfig {
    /// Module configuration with every option left at the module's default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval_secs: None,
            path: None,
            command: None,
            capacity: None,
        }
    }

    /// Configured interval, or `default` seconds.
    pub fn interval_or(&self, default: u64) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(default))
    }

    /// Configured text capacity, or the crate default.
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CAPACITY)
    }
}

/// Configuration of the module set and the aggregator loop.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StatusConfig {
    /// Time in milliseconds the aggregator waits after the first update
    /// signal before rendering a frame.
    #[validate(range(min = 1, max = 1000, message = "Debounce must be between 1 and 1000 ms"))]
    pub debounce_ms: u64,

    /// Activated modules in output order.
    #[validate(nested)]
    pub modules: Vec<ModuleConfig>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            modules: ["sysinfo", "df", "battery", "clock"]
                .into_iter()
                .map(ModuleConfig::named)
                .collect(),
        }
    }
}

impl StatusConfig {
    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Return the configured module names in output order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Replaces the configured module list with bare module names taken from
    /// the command line. Options of a configured module with the same name
    /// are kept.
    pub fn override_modules(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }

        self.modules = names
            .iter()
            .map(|name| {
                self.modules
                    .iter()
                    .find(|m| &m.name == name)
                    .cloned()
                    .unwrap_or_else(|| ModuleConfig::named(name.as_str()))
            })
            .collect();
    }
}
