//! An in-memory [`BlobStore`](crate::BlobStore), used by the rest of the
//! workspace's test suites as a concrete adapter to run against. Not a
//! shipped storage driver.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;
use crate::{BlobStore, Quota};

/// A `HashMap`-backed, `RwLock`-guarded [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn quota(&self) -> Result<Quota> {
        let usage: u64 = self
            .entries
            .read()
            .values()
            .map(|v| v.len() as u64)
            .sum();
        Ok(Quota {
            usage,
            quota: None,
            available: None,
        })
    }
}
