//! The abstract working-tree contract the index and status components
//! consume. Concretely this is "a thin path to blob mapping" (§1); real
//! filesystem or IndexedDB adapters live outside this crate. The
//! in-memory adapter here exists only so the rest of this crate's tests
//! have something to run against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use webgit_core::Result;
use webgit_odb::FileMode;

/// Stat metadata for a single working-tree file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// File size in bytes.
    pub size: u64,
    /// Modification time, nanoseconds since Unix epoch.
    pub mtime_ns: i64,
    /// Status-change time, nanoseconds since Unix epoch.
    pub ctime_ns: i64,
    /// The file's mode (regular, executable, symlink).
    pub mode: FileMode,
}

/// The working tree the index stages from and status compares against.
#[async_trait]
pub trait WorkingTree: Send + Sync {
    /// Reads a file's full content, if it exists.
    async fn read(&self, path: &str) -> Result<Option<Bytes>>;

    /// Reads a file's stat metadata, if it exists.
    async fn stat(&self, path: &str) -> Result<Option<FileStat>>;

    /// Lists every file path currently present in the working tree, in
    /// no particular order.
    async fn list_paths(&self) -> Result<Vec<String>>;
}

#[derive(Clone)]
struct Entry {
    data: Bytes,
    stat: FileStat,
}

/// An in-memory [`WorkingTree`] fixture.
#[derive(Default)]
pub struct MemoryWorkingTree {
    files: RwLock<HashMap<String, Entry>>,
    clock: RwLock<i64>,
}

impl MemoryWorkingTree {
    /// Creates an empty working tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes (or overwrites) a regular file, stamping a fresh,
    /// monotonically increasing mtime/ctime so successive writes to the
    /// same path are observably different stats.
    pub fn write_file(&self, path: &str, content: impl Into<Bytes>) {
        self.write_with_mode(path, content, FileMode::Regular);
    }

    /// Writes a file with an explicit mode (e.g. an executable or a
    /// symlink whose content is its target).
    pub fn write_with_mode(&self, path: &str, content: impl Into<Bytes>, mode: FileMode) {
        let data: Bytes = content.into();
        let mut clock = self.clock.write();
        *clock += 1;
        let ts = *clock;
        self.files.write().insert(
            path.to_string(),
            Entry {
                stat: FileStat {
                    size: data.len() as u64,
                    mtime_ns: ts,
                    ctime_ns: ts,
                    mode,
                },
                data,
            },
        );
    }

    /// Removes a file, simulating a working-tree delete.
    pub fn remove_file(&self, path: &str) {
        self.files.write().remove(path);
    }
}

#[async_trait]
impl WorkingTree for MemoryWorkingTree {
    async fn read(&self, path: &str) -> Result<Option<Bytes>> {
        Ok(self.files.read().get(path).map(|e| e.data.clone()))
    }

    async fn stat(&self, path: &str) -> Result<Option<FileStat>> {
        Ok(self.files.read().get(path).map(|e| e.stat))
    }

    async fn list_paths(&self) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

/// Shared-ownership convenience for tests and callers that want one
/// working tree handle cloned across components.
pub type SharedWorkingTree = Arc<MemoryWorkingTree>;
