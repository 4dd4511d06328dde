//! Errors surfaced by a [`crate::BlobStore`] implementation.

use thiserror::Error;

/// Errors a blob-store adapter may report. The core never matches on
/// these directly outside of object-database/ref-store code; it converts
/// them into [`webgit_core::Error`] at the boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested key does not exist.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The underlying storage medium reported an I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store is out of space or over its quota.
    #[error("storage full")]
    Full,

    /// The stored bytes failed an adapter-level integrity check.
    #[error("corruption: {0}")]
    Corruption(String),
}

/// A specialized `Result` for blob-store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for webgit_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => webgit_core::Error::not_found(key),
            StorageError::Io(e) => webgit_core::Error::Io(e.to_string()),
            StorageError::Full => webgit_core::Error::QuotaExceeded,
            StorageError::Corruption(msg) => webgit_core::Error::corrupt(msg),
        }
    }
}
