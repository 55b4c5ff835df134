//! Storage layer: read access to stored documents, keyed by container and object key.

mod error;
mod fs;
mod memory;

pub use error::StoreError;
pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Read-only blob store capability.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full contents of `key` in `container`.
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}
