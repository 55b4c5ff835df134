//! In-memory blob store, for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::{BlobStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_object(self, container: &str, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.put(container, key, bytes);
        self
    }

    pub fn put(&self, container: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((container.to_string(), key.to_string()), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new().with_object("b", "acme/a.txt", "hello");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("b", "acme/a.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn containers_are_separate() {
        let store = MemoryStore::new().with_object("b1", "k", "x");
        assert!(matches!(
            store.get("b2", "k").await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
