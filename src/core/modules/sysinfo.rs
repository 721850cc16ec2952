use std::path::{Path, PathBuf};

use super::{
    error::ModuleError,
    traits::{FromConfig, Periodic, Sampler},
    types::{ModuleResult, Render},
};
use crate::{config::status::ModuleConfig, register_module};

/// One-minute load average and uptime, as `🐧 0.42 3d 7h`.
///
/// Reads `loadavg` and `uptime` under the configured procfs root
/// (default `/proc`).
#[derive(Debug, Clone)]
pub struct SystemLoad {
    proc_root: PathBuf,
}

impl FromConfig for SystemLoad {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        Ok(SystemLoad {
            proc_root: config.path.clone().unwrap_or_else(|| PathBuf::from("/proc")),
        })
    }
}

#[async_trait::async_trait]
impl Sampler for SystemLoad {
    const DEFAULT_INTERVAL_SECS: u64 = 10;

    async fn sample(&mut self) -> ModuleResult<Render> {
        let loadavg = read_proc_file(&self.proc_root.join("loadavg")).await?;
        let uptime = read_proc_file(&self.proc_root.join("uptime")).await?;

        let load = parse_load(&loadavg)?;
        let uptime_secs = parse_uptime(&uptime)?;

        Ok(Render::shown(render_sysinfo(load, uptime_secs)))
    }
}

register_module!(Periodic<SystemLoad>, "sysinfo");

async fn read_proc_file(path: &Path) -> ModuleResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ModuleError::FileRead {
            path: path.display().to_string(),
            source,
        })
}

/// Extracts the one-minute load average from `loadavg` contents,
/// e.g. `"0.42 0.30 0.25 1/234 5678"`.
pub fn parse_load(content: &str) -> ModuleResult<f64> {
    let field = content
        .split_whitespace()
        .next()
        .ok_or_else(|| ModuleError::InvalidFormat {
            location: "loadavg".to_string(),
            reason: "file is empty".to_string(),
        })?;

    field.parse::<f64>().map_err(|_| ModuleError::ParseError {
        metric: "one_minute".to_string(),
        location: "loadavg".to_string(),
        reason: format!("invalid value: {}", field),
    })
}

/// Extracts whole seconds of uptime from `uptime` contents,
/// e.g. `"12345.67 54321.00"`.
pub fn parse_uptime(content: &str) -> ModuleResult<u64> {
    let field = content
        .split_whitespace()
        .next()
        .ok_or_else(|| ModuleError::InvalidFormat {
            location: "uptime".to_string(),
            reason: "file is empty".to_string(),
        })?;

    let secs = field.parse::<f64>().map_err(|_| ModuleError::ParseError {
        metric: "uptime_seconds".to_string(),
        location: "uptime".to_string(),
        reason: format!("invalid value: {}", field),
    })?;

    Ok(secs.max(0.0) as u64)
}

pub fn render_sysinfo(load: f64, uptime_secs: u64) -> String {
    let hours = uptime_secs / 3600;
    format!("🐧 {:.2} {}d {}h", load, hours / 24, hours % 24)
}
