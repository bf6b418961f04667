//! Persistence of the last submitted URL.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ClientResult;

/// Default state file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = ".vbot-last-url";

/// Single-value file store for the most recently submitted URL.
#[derive(Debug, Clone)]
pub struct LastUrlStore {
    path: PathBuf,
}

impl LastUrlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location from `VBOT_STATE_FILE`, else [`DEFAULT_STATE_FILE`].
    pub fn from_env() -> Self {
        let path = std::env::var("VBOT_STATE_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previously saved URL; missing or unreadable state yields `None`.
    pub async fn load(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let url = contents.trim();
                (!url.is_empty()).then(|| url.to_string())
            }
            Err(e) => {
                debug!("No saved URL at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn save(&self, url: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, url.trim()).await?;
        Ok(())
    }
}
