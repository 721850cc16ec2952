use std::{
    os::unix::fs::DirBuilderExt,
    path::{Path, PathBuf},
};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{
    backoff::Backoff,
    error::ModuleError,
    traits::{FromConfig, Module, ModuleHandle},
    types::{ModuleResult, Render},
    watch::DirWatch,
};
use crate::{config::status::ModuleConfig, register_module};

/// Contents of every file in a drop directory, joined by `/`.
///
/// Other programs write one short item per file into the directory
/// (default `$XDG_RUNTIME_DIR/inostatus`) and delete it to clear the item.
/// Dot files are ignored so writers can stage a temporary file and rename it
/// into place. Hidden while the directory is empty.
///
/// If the directory disappears while running (for example when the runtime
/// directory is cleaned), the module hides itself and recreates the
/// directory and its watch with backoff.
#[derive(Debug)]
pub struct DropItems {
    dir: PathBuf,
    last: Option<Render>,
}

impl FromConfig for DropItems {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        let dir = match &config.path {
            Some(path) => path.clone(),
            None => std::env::var_os("XDG_RUNTIME_DIR")
                .filter(|d| !d.is_empty())
                .map(|d| PathBuf::from(d).join("inostatus"))
                .ok_or_else(|| ModuleError::InvalidConfig {
                    module: config.name.clone(),
                    reason: "no path configured and XDG_RUNTIME_DIR is not set".to_string(),
                })?,
        };

        Ok(DropItems { dir, last: None })
    }
}

#[async_trait::async_trait]
impl Module for DropItems {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
        ensure_dir(&self.dir)?;
        let mut watch = DirWatch::new(&self.dir, None)?;
        let mut backoff = Backoff::default();

        loop {
            if let Err(e) = self.follow(&handle, &mut watch, &mut backoff).await {
                warn!("Drop directory {} unavailable: {}", self.dir.display(), e);
            }
            self.publish(&handle, Render::hidden());

            watch = loop {
                let delay = backoff.next_sleep();
                debug!("Recreating drop directory watch in {:?}", delay);
                sleep(delay).await;

                match ensure_dir(&self.dir).and_then(|()| DirWatch::new(&self.dir, None)) {
                    Ok(watch) => break watch,
                    Err(e) => warn!("Failed to restore drop directory {}: {}", self.dir.display(), e),
                }
            };
        }
    }
}

register_module!(DropItems, "inoitems");

impl DropItems {
    fn publish(&mut self, handle: &ModuleHandle, render: Render) {
        if self.last.as_ref() != Some(&render) {
            handle.render(&render);
            self.last = Some(render);
        }
    }

    /// Renders on every change until the directory can no longer be read.
    async fn follow(
        &mut self,
        handle: &ModuleHandle,
        watch: &mut DirWatch,
        backoff: &mut Backoff,
    ) -> ModuleResult<()> {
        loop {
            let render = render_items(&self.dir).await?;
            backoff.reset();
            self.publish(handle, render);

            watch.changed().await?;
            debug!("Drop directory {} changed", self.dir.display());
        }
    }
}

/// Creates the drop directory, private to the current user, if missing.
fn ensure_dir(dir: &Path) -> ModuleResult<()> {
    if dir.is_dir() {
        return Ok(());
    }

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(|source| ModuleError::FileRead {
            path: dir.display().to_string(),
            source,
        })?;
    info!("Created drop directory {}", dir.display());
    Ok(())
}

/// Reads all items in name order.
///
/// Files that disappear between listing and reading are skipped.
pub async fn render_items(dir: &Path) -> ModuleResult<Render> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| ModuleError::FileRead {
            path: dir.display().to_string(),
            source,
        })?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| ModuleError::FileRead {
            path: dir.display().to_string(),
            source,
        })?
    {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let mut items = Vec::with_capacity(names.len());
    for name in names {
        match tokio::fs::read_to_string(dir.join(&name)).await {
            Ok(content) => {
                let item = content.trim_end_matches(['\n', '\r']);
                if !item.is_empty() {
                    items.push(item.to_string());
                }
            }
            Err(e) => debug!("Skipping {:?}: {}", name, e),
        }
    }

    if items.is_empty() {
        Ok(Render::hidden())
    } else {
        Ok(Render::shown(items.join("/")))
    }
}
