//! `read_blob_at` and `log` (C9): pure historical reads over the commit
//! graph, never touching the working tree.

use std::collections::HashSet;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use webgit_core::{Error, Hash, Result};
use webgit_odb::{Commit, Object};
use webgit_storage::BlobStore;

use crate::repository::Repository;
use crate::tree_util::{commit_tree, read_blob};

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

impl<S: BlobStore> Repository<S> {
    /// Reads a file's content as of `commit`, walking the tree object
    /// graph directly rather than mutating the working tree.
    pub async fn read_blob_at(&self, commit: Hash, path: &str) -> Result<Bytes> {
        let _guard = self.lock.read().await;
        let mut current = commit_tree(&self.odb, commit).await?;
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return Err(Error::invalid_name("read_blob_at requires a non-empty path"));
        }

        for (i, component) in components.iter().enumerate() {
            let Object::Tree(tree) = self.odb.get(&current).await? else {
                return Err(Error::malformed(format!("expected tree object at {current}")));
            };
            let entry = tree
                .get(component)
                .ok_or_else(|| Error::not_found(format!("{path} (no entry '{component}')")))?;
            let is_last = i == components.len() - 1;
            if is_last {
                if entry.mode.is_dir() {
                    return Err(Error::invalid_name(format!("{path} names a directory, not a file")));
                }
                return read_blob(&self.odb, entry.hash).await;
            }
            if !entry.mode.is_dir() {
                return Err(Error::not_found(format!("{path}: '{component}' is not a directory")));
            }
            current = entry.hash;
        }
        unreachable!("loop always returns on the last component")
    }

    /// Walks the commit graph reachable from `start`, newest-first by
    /// commit timestamp, optionally truncated to `limit` entries.
    pub async fn log(&self, start: Hash, limit: Option<usize>, cancel: &CancellationToken) -> Result<Vec<Commit>> {
        check_cancelled(cancel)?;
        let _guard = self.lock.read().await;
        let mut seen = HashSet::new();
        let mut queue = vec![start];
        seen.insert(start);
        let mut commits: Vec<(Hash, Commit)> = Vec::new();

        while let Some(hash) = queue.pop() {
            check_cancelled(cancel)?;
            let Object::Commit(commit) = self.odb.get(&hash).await? else {
                return Err(Error::malformed(format!("{hash} is not a commit")));
            };
            for parent in &commit.parents {
                if seen.insert(*parent) {
                    queue.push(*parent);
                }
            }
            commits.push((hash, commit));
        }

        commits.sort_by(|(ha, a), (hb, b)| {
            b.committer
                .seconds
                .cmp(&a.committer.seconds)
                .then_with(|| ha.to_hex().cmp(&hb.to_hex()))
        });

        let mut result: Vec<Commit> = commits.into_iter().map(|(_, c)| c).collect();
        if let Some(limit) = limit {
            result.truncate(limit);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use webgit_core::RepoConfig;
    use webgit_index::{AddOptions, MemoryWorkingTree};
    use webgit_storage::MemoryStore;

    use super::*;

    fn config() -> RepoConfig {
        let mut cfg = RepoConfig::default();
        cfg.user_name = Some("A".to_string());
        cfg.user_email = Some("a@x".to_string());
        cfg
    }

    #[tokio::test]
    async fn log_returns_newest_first_and_respects_limit() {
        let store = Arc::new(MemoryStore::new());
        let tree = Arc::new(MemoryWorkingTree::new());
        let repo = Repository::init(store, config(), Some(tree.clone())).await.unwrap();
        let cancel = CancellationToken::new();

        tree.write_file("a", "1\n");
        repo.add(&["a".to_string()], AddOptions::default(), &cancel).await.unwrap();
        repo.commit("first\n", None, &cancel).await.unwrap();

        tree.write_file("a", "2\n");
        repo.add(&["a".to_string()], AddOptions::default(), &cancel).await.unwrap();
        let second = repo.commit("second\n", None, &cancel).await.unwrap();

        let log = repo.log(second, None, &cancel).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "second\n");
        assert_eq!(log[1].message, "first\n");

        let limited = repo.log(second, Some(1), &cancel).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].message, "second\n");
    }

    #[tokio::test]
    async fn read_blob_at_descends_into_subdirectories() {
        let store = Arc::new(MemoryStore::new());
        let tree = Arc::new(MemoryWorkingTree::new());
        let repo = Repository::init(store, config(), Some(tree.clone())).await.unwrap();
        let cancel = CancellationToken::new();

        tree.write_file("dir/nested.txt", "hello\n");
        repo.add(&["dir/nested.txt".to_string()], AddOptions::default(), &cancel)
            .await
            .unwrap();
        let commit = repo.commit("add nested\n", None, &cancel).await.unwrap();

        let content = repo.read_blob_at(commit, "dir/nested.txt").await.unwrap();
        assert_eq!(content, Bytes::from_static(b"hello\n"));

        assert!(repo.read_blob_at(commit, "dir/missing.txt").await.is_err());
        assert!(repo.read_blob_at(commit, "dir").await.is_err());
    }
}
