//! Object storage for original uploaded documents

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// Opaque object store over a flat key space
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, overwriting any previous object
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Fetch the object stored under `key`
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove the object stored under `key`; missing objects are not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// File-system backed blob store rooted at a directory.
///
/// Keys are sanitized file names; anything that looks like a path is
/// rejected before touching the file system.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `root` (created lazily on first put)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(Error::validation(format!("invalid blob key '{}'", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(&path, &data).await?;
        debug!(key = %key, bytes = data.len(), "stored blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found(format!("no blob stored under '{}'", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
