//! The staging area (C5): ordered path entries, ignore rules, and tree
//! materialization, plus the abstract working-tree contract it and the
//! status component (C6) consume.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ignore;
pub mod index;
pub mod working_tree;

pub use ignore::IgnoreSet;
pub use index::{AddOptions, Index, IndexEntry};
pub use working_tree::{FileStat, MemoryWorkingTree, WorkingTree};
