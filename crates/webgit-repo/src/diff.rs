//! `diff_worktree_to_head` and `diff_commits` (C9 over C8): per-path
//! unified diffs between two trees, or between the working tree and
//! `HEAD`.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use webgit_core::{Error, Hash, Result};
use webgit_diff::{diff_files, DiffOptions, FileDiff};
use webgit_storage::BlobStore;

use crate::repository::Repository;
use crate::tree_util::{commit_tree, flatten_tree, read_blob};

/// One path's diff, as produced by [`Repository::diff_commits`] or
/// [`Repository::diff_worktree_to_head`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDiff {
    /// Repository-relative path.
    pub path: String,
    /// The computed diff for that path.
    pub diff: FileDiff,
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

impl<S: BlobStore> Repository<S> {
    /// Diffs the committed content at `a` against `b`, one entry per
    /// path that differs between the two trees.
    pub async fn diff_commits(
        &self,
        a: Hash,
        b: Hash,
        opts: DiffOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathDiff>> {
        check_cancelled(cancel)?;
        let _guard = self.lock.read().await;
        let tree_a = commit_tree(&self.odb, a).await?;
        let tree_b = commit_tree(&self.odb, b).await?;

        let mut map_a = BTreeMap::new();
        flatten_tree(&self.odb, Some(tree_a), "", &mut map_a).await?;
        let mut map_b = BTreeMap::new();
        flatten_tree(&self.odb, Some(tree_b), "", &mut map_b).await?;

        let mut paths: Vec<&String> = map_a.keys().chain(map_b.keys()).collect();
        paths.sort();
        paths.dedup();

        let mut out = Vec::new();
        for path in paths {
            check_cancelled(cancel)?;
            let old_hash = map_a.get(path).copied();
            let new_hash = map_b.get(path).copied();
            if old_hash == new_hash {
                continue;
            }
            let old_bytes = match old_hash {
                Some(h) => read_blob(&self.odb, h).await?,
                None => Bytes::new(),
            };
            let new_bytes = match new_hash {
                Some(h) => read_blob(&self.odb, h).await?,
                None => Bytes::new(),
            };
            out.push(PathDiff {
                path: path.clone(),
                diff: diff_files(&old_bytes, &new_bytes, opts),
            });
        }
        Ok(out)
    }

    /// Diffs the live working tree against `HEAD`'s committed content,
    /// one entry per path that differs.
    pub async fn diff_worktree_to_head(
        &self,
        opts: DiffOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathDiff>> {
        check_cancelled(cancel)?;
        let _guard = self.lock.read().await;
        let working_tree = self.require_working_tree()?;

        let head_tree = match self.head_commit().await? {
            Some(commit) => Some(commit_tree(&self.odb, commit).await?),
            None => None,
        };
        let mut head_map = BTreeMap::new();
        flatten_tree(&self.odb, head_tree, "", &mut head_map).await?;

        let working_paths = working_tree.list_paths().await?;
        let mut paths: Vec<String> = head_map.keys().cloned().collect();
        for path in &working_paths {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths.sort();

        let mut out = Vec::new();
        for path in paths {
            check_cancelled(cancel)?;
            let old_bytes = match head_map.get(&path) {
                Some(h) => read_blob(&self.odb, *h).await?,
                None => Bytes::new(),
            };
            let new_bytes = working_tree.read(&path).await?.unwrap_or_default();
            if old_bytes == new_bytes {
                continue;
            }
            out.push(PathDiff {
                path,
                diff: diff_files(&old_bytes, &new_bytes, opts),
            });
        }
        Ok(out)
    }
}
