use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::{error::ModuleError, types::ModuleResult};

/// Non-recursive watch on one directory, optionally narrowed to a single
/// file name inside it.
///
/// Watching the directory rather than the file keeps notifications flowing
/// across atomic replaces and delete/recreate cycles. Bursts of events
/// collapse into one pending change.
pub struct DirWatch {
    dir: PathBuf,
    rx: mpsc::Receiver<()>,
    _watcher: RecommendedWatcher,
}

impl DirWatch {
    pub fn new(dir: &Path, file_name: Option<OsString>) -> ModuleResult<Self> {
        if !dir.is_dir() {
            return Err(ModuleError::PathNotFound {
                path: dir.display().to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(1);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let relevant = match &file_name {
                        Some(name) => event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(name.as_os_str())),
                        None => true,
                    };
                    if relevant {
                        trace!("Watch event: {:?}", event.kind);
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .map_err(|source| ModuleError::Watch {
            path: dir.display().to_string(),
            source,
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| ModuleError::Watch {
                path: dir.display().to_string(),
                source,
            })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            rx,
            _watcher: watcher,
        })
    }

    /// Waits for the next change. Fails if the watcher thread went away.
    pub async fn changed(&mut self) -> ModuleResult<()> {
        match self.rx.recv().await {
            Some(()) => Ok(()),
            None => Err(ModuleError::Watch {
                path: self.dir.display().to_string(),
                source: notify::Error::generic("watcher stopped"),
            }),
        }
    }
}
