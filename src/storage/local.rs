//! Local-filesystem object store.

use super::ObjectStore;
use crate::error::StorageError;
use crate::model::BinaryRef;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Stores objects as files under `root`. Writes go to a temp file that is
/// renamed into place, so readers never see a partial object.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path onto the filesystem, refusing anything that could
    /// leave `root`.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && !path.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}

fn io_error(path: &Path, source: std::io::Error, key: &str) -> StorageError {
    if source.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound {
            key: key.to_string(),
        }
    } else {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<BinaryRef, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e, path))?;
        }

        let tmp = target.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e, path))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| io_error(&target, e, path))?;

        debug!("Stored {} bytes at {}", bytes.len(), target.display());

        Ok(BinaryRef {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            url: self.url_for(path),
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map(Bytes::from)
            .map_err(|e| io_error(&target, e, path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| io_error(&target, e, path))?;
        debug!("Deleted {}", target.display());
        Ok(())
    }
}
