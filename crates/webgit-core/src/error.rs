//! The error taxonomy shared by every webgit crate.
//!
//! Each crate in the workspace defines its own narrower error enum for its
//! own concerns, but every one of those enums ultimately maps onto this
//! taxonomy via `#[from]` conversions, and every variant here carries a
//! stable [`Code`] for programmatic dispatch at the boundary.

use thiserror::Error;

/// Stable, short codes for user-visible dispatch. These never change shape
/// once published; add new ones rather than repurposing an existing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// ENOENT
    NotFound,
    /// EEXIST
    AlreadyExists,
    /// EISDIR
    IsDir,
    /// ENOTDIR
    NotDir,
    /// ENOTEMPTY
    NotEmpty,
    /// EINVAL
    Invalid,
    /// QUOTA_EXCEEDED
    QuotaExceeded,
    /// MERGE_CONFLICT
    MergeConflict,
    /// DIRTY_WORKING_TREE
    DirtyWorkingTree,
    /// NOT_A_REPO
    NotARepo,
    /// EIO
    IoError,
}

impl Code {
    /// Returns the stable short string for this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "ENOENT",
            Self::AlreadyExists => "EEXIST",
            Self::IsDir => "EISDIR",
            Self::NotDir => "ENOTDIR",
            Self::NotEmpty => "ENOTEMPTY",
            Self::Invalid => "EINVAL",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::MergeConflict => "MERGE_CONFLICT",
            Self::DirtyWorkingTree => "DIRTY_WORKING_TREE",
            Self::NotARepo => "NOT_A_REPO",
            Self::IoError => "EIO",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type visible at every webgit crate boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested object, ref, or path was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The thing being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A ref, path, or identifier name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A hex hash string was malformed or the wrong width.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// An object's byte framing did not parse.
    #[error("malformed object: {0}")]
    Malformed(String),

    /// A repository-private serialization (index, config) failed to
    /// encode or decode.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An object failed hash verification or decompression.
    #[error("corrupt object: {0}")]
    Corrupt(String),

    /// A decoded header's size did not match the payload length.
    #[error("size mismatch: header said {expected}, payload was {actual}")]
    SizeMismatch {
        /// Size declared in the object header.
        expected: usize,
        /// Actual payload size observed.
        actual: usize,
    },

    /// The underlying blob store reported an I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The blob store is out of quota.
    #[error("quota exceeded")]
    QuotaExceeded,

    /// A compare-and-set ref update lost the race.
    #[error("ref update conflict on {0}: expected value did not match")]
    RefUpdateConflict(String),

    /// A merge produced one or more unresolved conflicts.
    #[error("merge conflict: {0} conflicting path(s)")]
    MergeConflict(usize),

    /// A general conflict not covered by a more specific variant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation was cancelled between two suspension points.
    #[error("operation cancelled")]
    Cancelled,

    /// The target store has no repository metadata (`config`/`HEAD`
    /// missing): `open` was called against an uninitialized store.
    #[error("not a repository: {0}")]
    NotARepo(String),
}

impl Error {
    /// Returns the stable code for this error, for programmatic dispatch.
    #[must_use]
    pub const fn code(&self) -> Code {
        match self {
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::InvalidName(_) | Self::InvalidHash(_) | Self::Malformed(_) => Code::Invalid,
            Self::Serialization(_) => Code::Invalid,
            Self::Corrupt(_) | Self::SizeMismatch { .. } => Code::Invalid,
            Self::Io(_) => Code::IoError,
            Self::QuotaExceeded => Code::QuotaExceeded,
            Self::RefUpdateConflict(_) => Code::MergeConflict,
            Self::MergeConflict(_) => Code::MergeConflict,
            Self::Conflict(_) => Code::MergeConflict,
            Self::Cancelled => Code::Invalid,
            Self::NotARepo(_) => Code::NotARepo,
        }
    }

    /// Shorthand for [`Error::NotFound`].
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for [`Error::InvalidName`].
    #[must_use]
    pub fn invalid_name(what: impl Into<String>) -> Self {
        Self::InvalidName(what.into())
    }

    /// Shorthand for [`Error::InvalidHash`].
    #[must_use]
    pub fn invalid_hash(what: impl Into<String>) -> Self {
        Self::InvalidHash(what.into())
    }

    /// Shorthand for [`Error::Malformed`].
    #[must_use]
    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed(what.into())
    }

    /// Shorthand for [`Error::Corrupt`].
    #[must_use]
    pub fn corrupt(what: impl Into<String>) -> Self {
        Self::Corrupt(what.into())
    }

    /// Shorthand for [`Error::NotARepo`].
    #[must_use]
    pub fn not_a_repo(what: impl Into<String>) -> Self {
        Self::NotARepo(what.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A specialized `Result` for webgit operations.
pub type Result<T> = std::result::Result<T, Error>;
