//! The unified-diff engine (C8): Myers line diff, hunk assembly with
//! context, unified/side-by-side/JSON emission, `apply`, and the
//! binary-file short-circuit shared with the merge engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binary;
pub mod diff;
pub mod lines;
pub mod myers;

pub use binary::{looks_binary, SNIFF_WINDOW};
pub use diff::{
    apply, diff, diff_files, format, BinaryDiff, Change, ChangeKind, Diff, DiffOptions, FileDiff,
    FormatStyle, Hunk,
};
pub use lines::{join_lines, split_lines, Lines};
pub use myers::Op;
