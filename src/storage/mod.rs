mod in_memory;
mod local_fs;

pub use in_memory::InMemoryStorage;
pub use local_fs::LocalFileStorage;

use crate::errors::StorageError;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

/// Key-addressed blob store. Keys are opaque strings; `/` has no special
/// meaning to callers.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Writes `bytes` only if nothing is stored under `key`.
    ///
    /// The default is a plain check followed by a write, so two racing
    /// callers can both see `Created`. Backends with a conditional write
    /// should override it.
    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> Result<PutOutcome, StorageError> {
        if self.exists(key).await? {
            return Ok(PutOutcome::AlreadyExists);
        }
        self.put(key, bytes).await?;
        Ok(PutOutcome::Created)
    }
}
