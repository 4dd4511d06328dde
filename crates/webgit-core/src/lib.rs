//! Shared types for the webgit crate family: the error taxonomy, the
//! content hash, repository configuration, and reference-name validation.
//!
//! Every other `webgit-*` crate depends on this one and on nothing else in
//! the family below it in the dependency graph.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod refname;

pub use config::RepoConfig;
pub use error::{Code, Error, Result};
pub use hash::{Accumulator, Hash, HashAlgo};
