//! Local filesystem storage implementation.
//!
//! The snapshot lives in a single pretty-printed JSON file:
//!
//! ```text
//! {
//!   "timestamp": "2025-03-14T09:05:00Z",
//!   "hash": "<hex digest>",
//!   "records": [ { "title": ..., "link": ..., "body": ..., "kind": ... } ]
//! }
//! ```
//!
//! Writes go to `<file>.tmp` first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Snapshot;
use crate::storage::{SnapshotStore, StateLoad};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage backed by the given state file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self) -> StateLoad {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StateLoad::Missing,
            Err(e) => {
                log::warn!("State file {} unreadable: {}", self.path.display(), e);
                return StateLoad::Corrupt(e.to_string());
            }
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => StateLoad::Found(snapshot),
            Err(e) => {
                log::warn!("State file {} is corrupt: {}", self.path.display(), e);
                StateLoad::Corrupt(e.to_string())
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        self.write_bytes(&bytes).await?;
        log::debug!(
            "Saved {} records to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
