//! The abstract key/value blob-store contract the webgit core consumes.
//!
//! Everything concrete about *how* bytes survive (filesystem, IndexedDB,
//! an HTTP-backed cache, encryption-at-rest) lives outside this crate.
//! [`MemoryStore`] is the one exception: a bare `HashMap`-backed adapter
//! shipped here purely so the rest of the workspace's test suites have
//! something real to run against.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod memory;

pub use error::StorageError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Usage/quota/available byte counts reported by a blob store, mirroring
/// browser storage-quota APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quota {
    /// Bytes currently used.
    pub usage: u64,
    /// Total bytes the store is permitted to use, if known.
    pub quota: Option<u64>,
    /// Bytes still available, if known.
    pub available: Option<u64>,
}

/// The abstract key/value blob store the webgit core consumes. Every
/// call is fallible; adapters translate their native errors into
/// [`StorageError`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the value stored at `key`, if any.
    async fn get(&self, key: &str) -> error::Result<Option<Bytes>>;

    /// Writes `value` at `key`, replacing any prior value.
    async fn set(&self, key: &str, value: Bytes) -> error::Result<()>;

    /// Removes the value at `key`, if any. Deleting an absent key is not
    /// an error.
    async fn delete(&self, key: &str) -> error::Result<()>;

    /// True if `key` currently has a value.
    async fn exists(&self, key: &str) -> error::Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Lists every key with the given prefix.
    async fn list(&self, prefix: &str) -> error::Result<Vec<String>>;

    /// Reads several keys at once. Default implementation calls [`get`]
    /// sequentially; adapters with a native batch API should override.
    ///
    /// [`get`]: BlobStore::get
    async fn get_batch(&self, keys: &[String]) -> error::Result<Vec<Option<Bytes>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    /// Writes several entries at once. Default implementation calls
    /// [`set`] sequentially.
    ///
    /// [`set`]: BlobStore::set
    async fn set_batch(&self, entries: &[(String, Bytes)]) -> error::Result<()> {
        for (key, value) in entries {
            self.set(key, value.clone()).await?;
        }
        Ok(())
    }

    /// Deletes several keys at once. Default implementation calls
    /// [`delete`] sequentially.
    ///
    /// [`delete`]: BlobStore::delete
    async fn delete_batch(&self, keys: &[String]) -> error::Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Reports usage/quota/available, if the adapter can determine them.
    async fn quota(&self) -> error::Result<Quota> {
        Ok(Quota::default())
    }
}
