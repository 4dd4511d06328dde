use std::collections::BTreeMap;

use webgit_core::{Error, Hash, Result};
use webgit_index::{IgnoreSet, Index, WorkingTree};
use webgit_odb::{Object, ObjectDatabase};
use webgit_storage::BlobStore;

/// The disjoint sets a working-tree status comparison produces (§4.6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// Paths present in the working tree but neither staged nor
    /// committed.
    pub untracked: Vec<String>,
    /// Paths whose working-tree content no longer matches the staged
    /// (or, if unstaged, committed) hash.
    pub modified: Vec<String>,
    /// Paths staged that did not exist in `HEAD`.
    pub staged_added: Vec<String>,
    /// Paths staged with content different from `HEAD`.
    pub staged_modified: Vec<String>,
    /// Paths present in `HEAD` that the index no longer has.
    pub staged_deleted: Vec<String>,
    /// Paths present in the index whose working-tree file has vanished.
    pub unstaged_deleted: Vec<String>,
}

impl Status {
    /// True when every set is empty: nothing staged, nothing dirty,
    /// nothing untracked.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty()
            && self.modified.is_empty()
            && self.staged_added.is_empty()
            && self.staged_modified.is_empty()
            && self.staged_deleted.is_empty()
            && self.unstaged_deleted.is_empty()
    }
}

async fn flatten_tree<S: BlobStore>(
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

/// Computes working-tree status per §4.6's five-step algorithm.
///
/// `index` is taken mutably so stat-only drift (a file was touched but
/// its content still hashes the same) can be refreshed opportunistically
/// without forcing a caller-visible re-stage.
pub async fn status<S: BlobStore>(
    odb: &ObjectDatabase<S>,
    index: &mut Index,
    head_tree: Option<Hash>,
    working_tree: &dyn WorkingTree,
    ignore: &IgnoreSet,
) -> Result<Status> {
    let mut head_map = BTreeMap::new();
    flatten_tree(odb, head_tree, "", &mut head_map).await?;

    let mut result = Status::default();

    // Steps 2-3: staged vs HEAD.
    for entry in index.entries() {
        match head_map.get(&entry.path) {
            None => result.staged_added.push(entry.path.clone()),
            Some(head_hash) if *head_hash != entry.hash => {
                result.staged_modified.push(entry.path.clone());
            }
            Some(_) => {}
        }
    }
    for path in head_map.keys() {
        if index.get(path).is_none() {
            result.staged_deleted.push(path.clone());
        }
    }

    // Step 4: walk the working tree.
    let working_paths = working_tree.list_paths().await?;
    for path in &working_paths {
        match index.get(path) {
            Some(entry) => {
                let Some(stat) = working_tree.stat(path).await? else { continue };
                let stat_matches = stat.size == entry.size
                    && stat.mtime_ns == entry.mtime_ns
                    && stat.ctime_ns == entry.ctime_ns
                    && stat.mode == entry.mode;
                if stat_matches {
                    continue;
                }
                let Some(data) = working_tree.read(path).await? else { continue };
                let fresh_hash = Object::Blob(data).hash(entry.hash.algo());
                if fresh_hash != entry.hash {
                    result.modified.push(path.clone());
                } else {
                    index.refresh_stat(path, stat);
                }
            }
            None => {
                if !ignore.matches(path) {
                    result.untracked.push(path.clone());
                }
            }
        }
    }

    // Step 5: entries the working tree no longer has.
    let working_set: std::collections::HashSet<&String> = working_paths.iter().collect();
    for entry in index.entries() {
        if !working_set.contains(&entry.path) {
            result.unstaged_deleted.push(entry.path.clone());
        }
    }

    result.staged_added.sort();
    result.staged_modified.sort();
    result.staged_deleted.sort();
    result.modified.sort();
    result.untracked.sort();
    result.unstaged_deleted.sort();

    Ok(result)
}
