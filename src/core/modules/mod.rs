/// Clock module.
/// Shows the local time, refreshed on minute boundaries.
///
/// Available when:
/// - `minimal` or `standard` features are enabled, OR
/// - `module-clock` feature is explicitly enabled
#[cfg(feature = "module-clock")]
pub mod clock;

/// Disk usage module.
/// Shows the used share of one filesystem via `statvfs`.
///
/// Available when:
/// - `minimal` or `standard` features are enabled on Linux, OR
/// - `module-df` feature is explicitly enabled on Linux
#[cfg(all(feature = "module-df", target_os = "linux"))]
pub mod df;

/// Load and uptime module.
/// Reads `/proc/loadavg` and `/proc/uptime`.
///
/// Available when:
/// - `minimal` or `standard` features are enabled on Linux, OR
/// - `module-sysinfo` feature is explicitly enabled on Linux
#[cfg(all(feature = "module-sysinfo", target_os = "linux"))]
pub mod sysinfo;

/// Battery module.
/// Reads the power supply class in sysfs.
///
/// Available when:
/// - `standard` feature is enabled on Linux, OR
/// - `module-battery` feature is explicitly enabled on Linux
#[cfg(all(feature = "module-battery", target_os = "linux"))]
pub mod battery;

/// Audio volume module.
/// Follows `pactl subscribe`.
///
/// Available when:
/// - `standard` feature is enabled, OR
/// - `module-pulse` feature is explicitly enabled
#[cfg(feature = "module-pulse")]
pub mod pulse;

/// Reminder log module.
/// Shows time since the latest entry of a watched log file.
///
/// Available when:
/// - `standard` feature is enabled, OR
/// - `module-meds` feature is explicitly enabled
#[cfg(feature = "module-meds")]
pub mod meds;

/// Drop directory module.
/// Shows the contents of files other programs leave in a directory.
///
/// Available when:
/// - `standard` feature is enabled on Unix, OR
/// - `module-inoitems` feature is explicitly enabled on Unix
#[cfg(all(feature = "module-inoitems", unix))]
pub mod inoitems;

/// Pending upgrades module.
/// Counts upgrades reported by an `apt-get` dry run.
///
/// Available when:
/// - `standard` feature is enabled, OR
/// - `module-apt` feature is explicitly enabled
#[cfg(feature = "module-apt")]
pub mod apt;

pub mod backoff;
pub mod catalog;
pub mod error;
pub mod traits;
pub mod types;
#[cfg(any(feature = "module-meds", all(feature = "module-inoitems", unix)))]
pub mod watch;

/// Module catalog and the registration facade.
pub use catalog::{ModuleCatalog, ModuleMeta, Modules};
/// Error type for module construction and sampling.
pub use error::ModuleError;
/// Producer contract, per-slot handle and interval runner.
pub use traits::{FromConfig, Module, ModuleHandle, Periodic, Sampler};
/// Common result and render types.
pub use types::{ModuleResult, Render};
