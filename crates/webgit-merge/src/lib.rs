//! Merge engine (C7): merge-base discovery, three-way content merge via
//! diff3 alignment, and three-way tree merge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod content_merge;
pub mod merge_base;
pub mod tree_merge;

pub use content_merge::{merge_content, ContentMergeOutcome, MARKER_OURS, MARKER_SEP, MARKER_THEIRS};
pub use merge_base::{can_fast_forward, is_ancestor, merge_base};
pub use tree_merge::{merge, merge_trees, Conflict, ConflictKind, TreeMergeOutcome};
