//! Filesystem-backed object store: `(bucket, key)` ↦ `<root>/<bucket>/<key>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::ObjectStoreError;
use crate::store::traits::ObjectStore;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve an object path, rejecting anything that could leave the root.
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        for (label, value) in [("bucket", bucket), ("key", key)] {
            if value.is_empty() {
                return Err(ObjectStoreError::InvalidKey {
                    key: key.to_string(),
                    reason: format!("empty {label}"),
                });
            }
            let safe = Path::new(value)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !safe {
                return Err(ObjectStoreError::InvalidKey {
                    key: key.to_string(),
                    reason: format!("{label} must be a relative path without '..'"),
                });
            }
        }
        Ok(self.root.join(bucket).join(key))
    }

    /// Store an object, creating parent directories as needed.
    #[cfg(test)]
    pub async fn put(&self, bucket: &str, key: &str, content: &[u8]) -> Result<(), ObjectStoreError> {
        let path = self.resolve(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        Ok(())
    }
}

fn not_found_or_io(bucket: &str, key: &str, e: std::io::Error) -> ObjectStoreError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        ObjectStoreError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.resolve(bucket, key)?;
        let content = fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(bucket, key, e))?;
        debug!(bucket, key, bytes = content.len(), "Fetched object");
        Ok(content)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.resolve(bucket, key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(bucket, key, e))?;
        debug!(bucket, key, "Deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (FsObjectStore::new(dir.path().to_path_buf()), dir)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let (store, _dir) = test_store();
        store.put("mail", "inbox/abc", b"raw email").await.unwrap();

        assert_eq!(store.get("mail", "inbox/abc").await.unwrap(), b"raw email");
        store.delete("mail", "inbox/abc").await.unwrap();
        assert!(matches!(
            store.get("mail", "inbox/abc").await,
            Err(ObjectStoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (store, _dir) = test_store();
        let err = store.delete("mail", "nope").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let (store, _dir) = test_store();
        for (bucket, key) in [("mail", "../escape"), ("..", "x"), ("mail", "/etc/passwd"), ("", "k")] {
            let err = store.get(bucket, key).await.unwrap_err();
            assert!(matches!(err, ObjectStoreError::InvalidKey { .. }), "{bucket}/{key}");
        }
    }
}
