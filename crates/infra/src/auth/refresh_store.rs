//! File-backed refresh state
//!
//! The token configuration file is rewritten whenever the server rotates
//! the refresh token. Writes go to a temporary file in the same directory,
//! are synced, and then renamed over the original, so a crash leaves either
//! the old or the new document on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use restsync_core::RefreshStateStore;
use restsync_domain::{Result, SyncError, TokenConfig, TokenConfigDocument};
use tempfile::NamedTempFile;
use tokio::task;
use tracing::debug;

use crate::errors::to_sync_error;

#[derive(Debug, Clone)]
pub struct FileRefreshStateStore {
    path: PathBuf,
}

impl FileRefreshStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_document(path: &Path) -> Result<TokenConfigDocument> {
    let contents = fs::read_to_string(path).map_err(|err| {
        SyncError::Config(format!("failed to read token config {}: {err}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|err| {
        SyncError::Config(format!("invalid token config {}: {err}", path.display()))
    })
}

fn write_document(path: &Path, config: &TokenConfig) -> Result<()> {
    // keep top-level fields written by other tools
    let document = match read_document(path) {
        Ok(mut existing) => {
            existing.token_config = config.clone();
            existing
        }
        Err(_) => TokenConfigDocument::new(config.clone()),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(to_sync_error)?;
    serde_json::to_writer_pretty(&mut temp, &document).map_err(to_sync_error)?;
    temp.write_all(b"\n").map_err(to_sync_error)?;
    temp.as_file().sync_all().map_err(to_sync_error)?;
    temp.persist(path).map_err(|err| to_sync_error(err.error))?;
    Ok(())
}

fn map_join_error(err: task::JoinError) -> SyncError {
    SyncError::Internal(format!("token config task failed: {err}"))
}

#[async_trait]
impl RefreshStateStore for FileRefreshStateStore {
    async fn load(&self) -> Result<TokenConfig> {
        let path = self.path.clone();
        let document =
            task::spawn_blocking(move || read_document(&path)).await.map_err(map_join_error)??;
        debug!(path = %self.path.display(), "Loaded token config");
        Ok(document.token_config)
    }

    async fn save(&self, config: &TokenConfig) -> Result<()> {
        let path = self.path.clone();
        let config = config.clone();
        task::spawn_blocking(move || write_document(&path, &config))
            .await
            .map_err(map_join_error)??;
        debug!(path = %self.path.display(), "Saved token config");
        Ok(())
    }
}
