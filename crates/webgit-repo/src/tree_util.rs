//! Small tree-walking helpers shared by the diff, merge, and history
//! operations: flattening a tree into a path map and resolving a
//! commit's tree hash.

use std::collections::BTreeMap;

use webgit_core::{Error, Hash, Result};
use webgit_odb::{Object, ObjectDatabase};
use webgit_storage::BlobStore;

/// Flattens a tree (or the empty tree, if `tree` is `None`) into a
/// `path -> blob hash` map, recursing through subdirectories.
pub(crate) async fn flatten_tree<S: BlobStore>(
    odb: &ObjectDatabase<S>,
    tree: Option<Hash>,
    prefix: &str,
    out: &mut BTreeMap<String, Hash>,
) -> Result<()> {
    let Some(hash) = tree else { return Ok(()) };
    let Object::Tree(tree) = odb.get(&hash).await? else {
        return Err(Error::malformed(format!("expected tree object at {hash}")));
    };
    for entry in tree.entries {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode.is_dir() {
            Box::pin(flatten_tree(odb, Some(entry.hash), &path, out)).await?;
        } else {
            out.insert(path, entry.hash);
        }
    }
    Ok(())
}

/// Resolves a commit hash to the tree hash it snapshots.
pub(crate) async fn commit_tree<S: BlobStore>(odb: &ObjectDatabase<S>, commit: Hash) -> Result<Hash> {
    match odb.get(&commit).await? {
        Object::Commit(c) => Ok(c.tree),
        other => Err(Error::malformed(format!("{commit} is not a commit (found {:?})", other.kind()))),
    }
}

/// Reads a blob's bytes, erroring if `hash` does not resolve to one.
pub(crate) async fn read_blob<S: BlobStore>(odb: &ObjectDatabase<S>, hash: Hash) -> Result<bytes::Bytes> {
    match odb.get(&hash).await? {
        Object::Blob(data) => Ok(data),
        other => Err(Error::malformed(format!("{hash} is not a blob (found {:?})", other.kind()))),
    }
}
