//! The Git object model and content-addressed object database: C1
//! (hashing, re-exported from `webgit-core`), C2 (object codec), and C3
//! (object database).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compression;
pub mod db;
pub mod object;

pub use db::ObjectDatabase;
pub use object::{Commit, FileMode, Object, ObjectKind, Signature, Tag, Tree, TreeEntry};
pub use webgit_core::hash::{one_shot, Accumulator, Hash, HashAlgo};
