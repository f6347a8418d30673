//! The durable store seam.
//!
//! The engine never touches a concrete storage medium; it is handed an
//! implementation of this trait (browser storage, filesystem, network)
//! by the embedding application. Implementations live in `qwest-store`.

use async_trait::async_trait;

use crate::error::StorageError;

/// Abstract durable key/value store.
///
/// Store I/O is the engine's only suspension point; everything else runs
/// to completion synchronously.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetch the bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `bytes` under `key`, replacing any previous value.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
