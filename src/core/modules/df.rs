use std::{ffi::CString, os::unix::ffi::OsStrExt, path::PathBuf};

use tracing::trace;

use super::{
    error::ModuleError,
    traits::{FromConfig, Periodic, Sampler},
    types::{ModuleResult, Render},
};
use crate::{config::status::ModuleConfig, register_module};

/// Used space of the filesystem holding `path`, as `💾 42%`.
#[derive(Debug, Clone)]
pub struct DiskUsage {
    path: PathBuf,
    c_path: CString,
}

impl DiskUsage {
    pub fn new(path: PathBuf) -> ModuleResult<Self> {
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|e| ModuleError::InvalidConfig {
                module: "df".to_string(),
                reason: format!("invalid path {}: {}", path.display(), e),
            })?;

        Ok(Self { path, c_path })
    }
}

impl FromConfig for DiskUsage {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        DiskUsage::new(config.path.clone().unwrap_or_else(|| PathBuf::from("/")))
    }
}

#[async_trait::async_trait]
impl Sampler for DiskUsage {
    const DEFAULT_INTERVAL_SECS: u64 = 10;

    async fn sample(&mut self) -> ModuleResult<Render> {
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::statvfs(self.c_path.as_ptr(), &mut stat) };

        if result != 0 {
            let err = std::io::Error::last_os_error();
            return Err(ModuleError::SystemCall {
                syscall: "statvfs".to_string(),
                reason: format!("{}: {}", self.path.display(), err),
            });
        }

        let total = stat.f_blocks as u64;
        let available = stat.f_bavail as u64;
        trace!(
            "statvfs {}: {} blocks, {} available",
            self.path.display(),
            total,
            available
        );

        let percent = used_percent(total, available).ok_or_else(|| ModuleError::InvalidFormat {
            location: self.path.display().to_string(),
            reason: "filesystem reports zero blocks".to_string(),
        })?;

        Ok(Render::shown(format!("💾 {}%", percent)))
    }
}

register_module!(Periodic<DiskUsage>, "df");

/// Share of blocks not available to unprivileged users, rounded to a whole
/// percent. `None` for an empty filesystem.
pub fn used_percent(total_blocks: u64, available_blocks: u64) -> Option<u32> {
    if total_blocks == 0 {
        return None;
    }

    let used = total_blocks.saturating_sub(available_blocks);
    Some((used as f64 * 100.0 / total_blocks as f64).round() as u32)
}
