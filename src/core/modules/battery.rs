use std::path::{Path, PathBuf};

use tracing::trace;

use super::{
    error::ModuleError,
    traits::{FromConfig, Periodic, Sampler},
    types::{ModuleResult, Render},
};
use crate::{config::status::ModuleConfig, register_module};

/// Charge level at or below which the low-battery icon is shown.
const LOW_PERCENT: u8 = 15;

/// Charge of the first battery under the power supply class directory
/// (default `/sys/class/power_supply`). Hidden on machines without one.
#[derive(Debug, Clone)]
pub struct Battery {
    root: PathBuf,
}

/// State of a single battery as reported by sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryState {
    pub capacity_percent: u8,
    pub status: String,
}

impl FromConfig for Battery {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        Ok(Battery {
            root: config
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from("/sys/class/power_supply")),
        })
    }
}

#[async_trait::async_trait]
impl Sampler for Battery {
    const DEFAULT_INTERVAL_SECS: u64 = 30;

    async fn sample(&mut self) -> ModuleResult<Render> {
        Ok(match read_battery(&self.root).await? {
            Some(state) => Render::shown(render_battery(&state)),
            None => Render::hidden(),
        })
    }
}

register_module!(Periodic<Battery>, "battery");

async fn read_attr(dir: &Path, attr: &str) -> Option<String> {
    tokio::fs::read_to_string(dir.join(attr))
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

/// Reads the first supply (by name) whose `type` is `Battery`.
///
/// A missing class directory means no batteries; `Ok(None)` is returned.
pub async fn read_battery(root: &Path) -> ModuleResult<Option<BatteryState>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ModuleError::FileRead {
                path: root.display().to_string(),
                source,
            })
        }
    };

    let mut supplies = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| ModuleError::FileRead {
            path: root.display().to_string(),
            source,
        })?
    {
        supplies.push(entry.path());
    }
    supplies.sort();

    for supply in supplies {
        if read_attr(&supply, "type").await.as_deref() != Some("Battery") {
            continue;
        }

        let Some(raw) = read_attr(&supply, "capacity").await else {
            trace!("Battery {} has no capacity attribute", supply.display());
            continue;
        };

        let capacity = raw.parse::<u8>().map_err(|_| ModuleError::ParseError {
            metric: "capacity".to_string(),
            location: supply.display().to_string(),
            reason: format!("invalid value: {}", raw),
        })?;

        let status = read_attr(&supply, "status")
            .await
            .unwrap_or_else(|| "Unknown".to_string());

        return Ok(Some(BatteryState {
            capacity_percent: capacity.min(100),
            status,
        }));
    }

    Ok(None)
}

pub fn render_battery(state: &BatteryState) -> String {
    let icon = match state.status.as_str() {
        "Charging" | "Full" | "Not charging" => '🔌',
        _ if state.capacity_percent <= LOW_PERCENT => '🪫',
        _ => '🔋',
    };
    format!("{} {}%", icon, state.capacity_percent)
}
