use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{
    error::ModuleError,
    traits::{FromConfig, Module, ModuleHandle},
    types::{ModuleResult, Render},
    watch::DirWatch,
};
use crate::{config::status::ModuleConfig, register_module};

/// Entries older than this are no longer shown.
const WINDOW_SECS: i64 = 24 * 60 * 60;

/// Delay between attempts to set up the log directory watch.
const RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Time since the latest entry of a reminder log, as `💊 evening 3:07`.
///
/// The log holds one `<unix-seconds> <label>` entry per line. The module
/// re-reads it whenever the file changes and re-renders at every minute of
/// elapsed time. It hides itself when the log is missing, empty, or the
/// latest entry is more than a day old.
#[derive(Debug)]
pub struct Reminders {
    path: PathBuf,
    last: Option<Render>,
}

/// The most recent line of a reminder log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub when: i64,
    pub label: String,
}

impl FromConfig for Reminders {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => default_log_path().ok_or_else(|| ModuleError::InvalidConfig {
                module: config.name.clone(),
                reason: "no path configured and HOME is not set".to_string(),
            })?,
        };

        if path.file_name().is_none() {
            return Err(ModuleError::InvalidConfig {
                module: config.name.clone(),
                reason: format!("{} does not name a file", path.display()),
            });
        }

        Ok(Reminders { path, last: None })
    }
}

#[async_trait::async_trait]
impl Module for Reminders {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watch = loop {
            match prepare_watch(&dir, file_name.clone()) {
                Ok(watch) => break watch,
                Err(e) => {
                    warn!("Reminder log directory not ready: {}", e);
                    self.publish(&handle, Render::hidden());
                    sleep(RETRY_INTERVAL).await;
                }
            }
        };

        loop {
            let entry = self.read_latest().await;
            let (render, wake) = evaluate(entry.as_ref(), chrono::Utc::now().timestamp());
            self.publish(&handle, render);

            tokio::select! {
                _ = sleep(wake) => {}
                changed = watch.changed() => {
                    changed?;
                    debug!("Reminder log {} changed", self.path.display());
                }
            }
        }
    }
}

register_module!(Reminders, "meds");

impl Reminders {
    fn publish(&mut self, handle: &ModuleHandle, render: Render) {
        if self.last.as_ref() != Some(&render) {
            handle.render(&render);
            self.last = Some(render);
        }
    }

    async fn read_latest(&self) -> Option<Entry> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_reminders(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Creates the log directory if missing and watches it for the log file.
fn prepare_watch(dir: &Path, file_name: Option<OsString>) -> ModuleResult<DirWatch> {
    std::fs::create_dir_all(dir).map_err(|source| ModuleError::FileRead {
        path: dir.display().to_string(),
        source,
    })?;
    DirWatch::new(dir, file_name)
}

fn default_log_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").filter(|h| !h.is_empty())?;
    Some(PathBuf::from(home).join(".local/share/linebar/meds.log"))
}

/// Latest entry of a reminder log. Malformed lines are skipped.
pub fn parse_reminders(content: &str) -> Option<Entry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (when, label) = line.split_once(char::is_whitespace)?;
            let label = label.trim();
            if label.is_empty() {
                return None;
            }
            Some(Entry {
                when: when.parse().ok()?,
                label: label.to_string(),
            })
        })
        .max_by_key(|entry| entry.when)
}

/// Render for `entry` at unix time `now`, and how long until it changes.
pub fn evaluate(entry: Option<&Entry>, now: i64) -> (Render, Duration) {
    let Some(entry) = entry else {
        return (Render::hidden(), Duration::from_secs(60));
    };

    // Entries stamped in the future count as just taken.
    let elapsed = (now - entry.when).max(0);
    if elapsed >= WINDOW_SECS {
        return (Render::hidden(), Duration::from_secs(60));
    }

    let minutes = elapsed / 60;
    let text = format!("💊 {} {}:{:02}", entry.label, minutes / 60, minutes % 60);
    let wake = Duration::from_secs((60 - elapsed % 60) as u64);

    (Render::shown(text), wake)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn entry(when: i64, label: &str) -> Entry {
        Entry {
            when,
            label: label.to_string(),
        }
    }

    #[test]
    fn latest_entry_wins() {
        let log = "# taken\n1700000000 morning\n\n1700040000 evening\n1700020000 noon\n";
        assert_eq!(parse_reminders(log), Some(entry(1_700_040_000, "evening")));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let log = "yesterday aspirin\n1700000000\n1700000100 vitamin d\n";
        assert_eq!(parse_reminders(log), Some(entry(1_700_000_100, "vitamin d")));
        assert_eq!(parse_reminders("# nothing yet\n\n"), None);
    }

    #[test]
    fn renders_elapsed_hours_and_minutes() {
        let e = entry(1_000, "evening");
        let (render, wake) = evaluate(Some(&e), 1_000 + 3 * 3600 + 7 * 60 + 20);
        assert_eq!(render, Render::shown("💊 evening 3:07"));
        assert_eq!(wake, Duration::from_secs(40));
    }

    #[test]
    fn fresh_entry_shows_zero() {
        let e = entry(5_000, "morning");
        let (render, wake) = evaluate(Some(&e), 5_000);
        assert_eq!(render, Render::shown("💊 morning 0:00"));
        assert_eq!(wake, Duration::from_secs(60));

        let (render, _) = evaluate(Some(&e), 4_000);
        assert_eq!(render, Render::shown("💊 morning 0:00"));
    }

    #[test]
    fn hidden_after_a_day() {
        let e = entry(0, "old");
        let (render, _) = evaluate(Some(&e), WINDOW_SECS - 1);
        assert!(render.visible);
        assert_eq!(render.text, "💊 old 23:59");

        let (render, _) = evaluate(Some(&e), WINDOW_SECS);
        assert_eq!(render, Render::hidden());
    }

    #[test]
    fn no_entry_is_hidden() {
        assert_eq!(evaluate(None, 0).0, Render::hidden());
    }

    #[tokio::test]
    async fn missing_log_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reminders = Reminders {
            path: dir.path().join("meds.log"),
            last: None,
        };
        assert_eq!(reminders.read_latest().await, None);

        fs::write(dir.path().join("meds.log"), "42 test\n").unwrap();
        assert_eq!(reminders.read_latest().await, Some(entry(42, "test")));
    }

    #[test]
    fn explicit_path_is_used() {
        let config = ModuleConfig {
            path: Some(PathBuf::from("/tmp/linebar-meds.log")),
            ..ModuleConfig::named("meds")
        };
        let reminders = Reminders::from_config(&config).unwrap();
        assert_eq!(reminders.path, PathBuf::from("/tmp/linebar-meds.log"));
    }

    #[tokio::test]
    async fn publishes_after_log_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meds.log");
        let slot = std::sync::Arc::new(crate::core::slot::OutputSlot::new("meds", 64));
        let (signal, _listener) = crate::core::signal::update_channel();
        let handle = ModuleHandle::new(std::sync::Arc::clone(&slot), signal);

        let mut reminders = Reminders {
            path: path.clone(),
            last: None,
        };
        let task = tokio::spawn(async move { reminders.run(handle).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!slot.snapshot().visible);

        let now = chrono::Utc::now().timestamp();
        fs::write(&path, format!("{} aspirin\n", now)).unwrap();

        let mut shown = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if slot.snapshot().visible {
                shown = true;
                break;
            }
        }
        assert!(shown, "reminder never became visible");
        assert!(slot.snapshot().text.starts_with("💊 aspirin 0:0"));

        task.abort();
    }

    #[tokio::test]
    async fn missing_log_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("not-yet/meds.log");
        let slot = std::sync::Arc::new(crate::core::slot::OutputSlot::new("meds", 64));
        let (signal, _listener) = crate::core::signal::update_channel();
        let handle = ModuleHandle::new(std::sync::Arc::clone(&slot), signal);

        let mut reminders = Reminders {
            path: path.clone(),
            last: None,
        };
        let task = tokio::spawn(async move { reminders.run(handle).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished(), "module must not fail on a missing directory");
        assert!(root.path().join("not-yet").is_dir());
        assert!(!slot.snapshot().visible);

        let now = chrono::Utc::now().timestamp();
        fs::write(&path, format!("{} ibuprofen\n", now)).unwrap();

        let mut shown = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if slot.snapshot().visible {
                shown = true;
                break;
            }
        }
        assert!(shown, "reminder never became visible");

        task.abort();
    }
}
