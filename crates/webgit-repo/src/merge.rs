//! `Repository::merge` (C9 over C7): fast-forward detection, three-way
//! merge-commit synthesis, and conflict reporting without ever leaving
//! a half-written state observable to a reader (§4.9).

use tokio_util::sync::CancellationToken;
use webgit_core::{Error, Hash, Result};
use webgit_odb::{Commit, Object};
use webgit_refs::{Expected, RefTarget};
use webgit_merge::{can_fast_forward, merge as merge_trees, merge_base, Conflict};
use webgit_storage::BlobStore;

use crate::repository::Repository;
use crate::tree_util::commit_tree;

/// Options governing [`Repository::merge`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// If the merge is fast-forward-eligible, advance the ref without
    /// creating a merge commit. If `false`, always synthesize a merge
    /// commit (with two parents) even when a fast-forward would do.
    pub allow_ff: bool,
}

/// The outcome of [`Repository::merge`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The new merge commit, if one was created.
    pub created_commit: Option<Hash>,
    /// True if the branch ref was advanced without a new commit.
    pub fast_forwarded: bool,
    /// Unresolved conflicts, if any. Non-empty iff `created_commit` is
    /// `None` and the merge was not trivially a no-op.
    pub conflicts: Vec<Conflict>,
    /// The best-effort merged tree (conflict markers embedded at
    /// conflicting paths), available for inspection even when
    /// `conflicts` is non-empty and no commit was made.
    pub merged_tree: Option<Hash>,
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

impl<S: BlobStore> Repository<S> {
    async fn resolve_ref_or_branch(&self, other_ref: &str) -> Result<Hash> {
        match self.refs.resolve(other_ref).await {
            Ok(hash) => Ok(hash),
            Err(Error::NotFound(_)) => self.refs.resolve(&format!("refs/heads/{other_ref}")).await,
            Err(e) => Err(e),
        }
    }

    /// Merges `other_ref` (a full ref name or a bare branch name) into
    /// the current branch.
    pub async fn merge(
        &self,
        other_ref: &str,
        opts: MergeOptions,
        cancel: &CancellationToken,
    ) -> Result<MergeOutcome> {
        check_cancelled(cancel)?;
        let _guard = self.lock.write().await;

        let theirs = self.resolve_ref_or_branch(other_ref).await?;
        let (branch, ours) = self.current_branch_and_parent().await?;

        let Some(ours) = ours else {
            // Unborn branch: merging is just a fast-forward to theirs.
            let branch = branch.ok_or_else(|| Error::invalid_name("cannot merge in detached HEAD with no commit"))?;
            self.refs.write(&branch, RefTarget::Direct(theirs), Expected::Absent).await?;
            return Ok(MergeOutcome {
                created_commit: None,
                fast_forwarded: true,
                conflicts: Vec::new(),
                merged_tree: None,
            });
        };

        if ours == theirs {
            // Merge self-identity (§8 property 6): a true no-op.
            return Ok(MergeOutcome {
                created_commit: None,
                fast_forwarded: false,
                conflicts: Vec::new(),
                merged_tree: Some(commit_tree(&self.odb, ours).await?),
            });
        }

        check_cancelled(cancel)?;
        if opts.allow_ff && can_fast_forward(&self.odb, ours, theirs).await? {
            self.advance(&branch, ours, theirs).await?;
            return Ok(MergeOutcome {
                created_commit: None,
                fast_forwarded: true,
                conflicts: Vec::new(),
                merged_tree: Some(commit_tree(&self.odb, theirs).await?),
            });
        }

        let base = merge_base(&self.odb, ours, theirs).await?;
        check_cancelled(cancel)?;
        let base_tree = commit_tree(&self.odb, base).await?;
        let ours_tree = commit_tree(&self.odb, ours).await?;
        let theirs_tree = commit_tree(&self.odb, theirs).await?;

        let outcome = merge_trees(&self.odb, Some(base_tree), Some(ours_tree), Some(theirs_tree)).await?;

        if !outcome.conflicts.is_empty() {
            tracing::warn!(count = outcome.conflicts.len(), "merge produced conflicts; no commit created");
            return Ok(MergeOutcome {
                created_commit: None,
                fast_forwarded: false,
                conflicts: outcome.conflicts,
                merged_tree: outcome.tree,
            });
        }

        check_cancelled(cancel)?;
        let signature = self.default_signature()?;
        let merged_tree = outcome
            .tree
            .ok_or_else(|| Error::malformed("clean merge produced no tree"))?;
        let commit = Commit {
            tree: merged_tree,
            parents: vec![ours, theirs],
            author: signature.clone(),
            committer: signature,
            message: format!("Merge '{other_ref}'\n"),
        };
        let commit_hash = self.odb.put(&Object::Commit(commit)).await?;
        self.advance(&branch, ours, commit_hash).await?;

        Ok(MergeOutcome {
            created_commit: Some(commit_hash),
            fast_forwarded: false,
            conflicts: Vec::new(),
            merged_tree: Some(merged_tree),
        })
    }

    async fn advance(&self, branch: &Option<String>, from: Hash, to: Hash) -> Result<()> {
        let expected = Expected::Value(RefTarget::Direct(from));
        match branch {
            Some(branch) => self.refs.write(branch, RefTarget::Direct(to), expected).await,
            None => self.refs.write("HEAD", RefTarget::Direct(to), expected).await,
        }
    }
}
