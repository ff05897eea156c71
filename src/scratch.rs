//! Per-event scratch directories.
//!
//! Attachments are materialised as `book{i}{ext}`, so two events sharing a
//! directory would overwrite each other. Every event gets its own
//! `event-<uuid>` directory under the configured scratch root.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// A scratch directory owned by exactly one event.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh, uniquely named directory under `root`.
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let path = root.join(format!("event-{}", Uuid::new_v4()));
        fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a file name inside the scratch directory.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it. Failures are logged only.
    pub async fn remove(self) {
        if let Err(e) = fs::remove_dir_all(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
