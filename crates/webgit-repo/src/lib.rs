//! The repository facade (C9): the one entry point that composes the
//! object database (C3), reference store (C4), index (C5), status
//! (C6), merge (C7), and diff (C8) engines into `init`/`open`/`add`/
//! `commit`/`status`/branch operations/`merge`/`diff`/`log`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod history;
mod merge;
mod repository;
mod tree_util;

pub use diff::PathDiff;
pub use merge::{MergeOptions, MergeOutcome};
pub use repository::Repository;
