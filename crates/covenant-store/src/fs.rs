//! Filesystem-backed blob store: `<root>/<container>/<key>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{BlobStore, StoreError};

/// Blob store rooted at a local directory.
///
/// Each container is a subdirectory of the root and object keys are relative
/// paths inside it. Keys that would escape the container (`..`, absolute
/// paths) are rejected.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf, StoreError> {
        for part in [container, key] {
            let rel = Path::new(part.trim_start_matches('/'));
            if part.is_empty()
                || rel
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(StoreError::InvalidKey(part.to_string()));
            }
        }
        Ok(self
            .root
            .join(container)
            .join(key.trim_start_matches('/')))
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(container, key)?;
        debug!(path = %path.display(), "reading object");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
