//! Merge-base discovery (§4.7.1): BFS from each tip, ancestry predicates,
//! and fast-forward eligibility, all defined in terms of the commit DAG
//! reachable through [`ObjectDatabase`].

use std::collections::HashSet;

use webgit_core::{Error, Hash, Result};
use webgit_odb::{Object, ObjectDatabase};
use webgit_storage::BlobStore;

async fn parents_of<S: BlobStore>(odb: &ObjectDatabase<S>, commit: &Hash) -> Result<Vec<Hash>> {
    match odb.get(commit).await? {
        Object::Commit(c) => Ok(c.parents),
        other => Err(Error::malformed(format!(
            "expected commit object at {commit}, found {:?}",
            other.kind()
        ))),
    }
}

async fn ancestors_of<S: BlobStore>(odb: &ObjectDatabase<S>, tip: &Hash) -> Result<HashSet<Hash>> {
    let mut seen = HashSet::new();
    let mut queue = vec![*tip];
    seen.insert(*tip);
    while let Some(current) = queue.pop() {
        for parent in parents_of(odb, &current).await? {
            if seen.insert(parent) {
                queue.push(parent);
            }
        }
    }
    Ok(seen)
}

/// Finds a lowest common ancestor of `a` and `b` by BFS from `a`,
/// collecting everything it can reach, then BFS from `b` stopping at the
/// first commit already seen from `a`. When several bases exist
/// (criss-cross histories) this returns whichever one BFS from `b`
/// encounters first; callers must not depend on which.
pub async fn merge_base<S: BlobStore>(odb: &ObjectDatabase<S>, a: Hash, b: Hash) -> Result<Hash> {
    if a == b {
        return Ok(a);
    }
    let reachable_from_a = ancestors_of(odb, &a).await?;
    if reachable_from_a.contains(&b) {
        return Ok(b);
    }

    let mut seen_from_b = HashSet::new();
    let mut queue = vec![b];
    seen_from_b.insert(b);
    while let Some(current) = queue.pop() {
        if reachable_from_a.contains(&current) {
            return Ok(current);
        }
        for parent in parents_of(odb, &current).await? {
            if seen_from_b.insert(parent) {
                queue.push(parent);
            }
        }
    }
    Err(Error::Conflict(format!(
        "no common ancestor between {a} and {b}"
    )))
}

/// True if `ancestor` is reachable from `descendant` by following
/// parent links.
pub async fn is_ancestor<S: BlobStore>(
    odb: &ObjectDatabase<S>,
    ancestor: Hash,
    descendant: Hash,
) -> Result<bool> {
    if ancestor == descendant {
        return Ok(true);
    }
    Ok(ancestors_of(odb, &descendant).await?.contains(&ancestor))
}

/// True iff advancing `from` straight to `to` would be a fast-forward:
/// `from` is an ancestor of `to`. Equivalent to `is_ancestor(from, to)`
/// (§8 property 5).
pub async fn can_fast_forward<S: BlobStore>(odb: &ObjectDatabase<S>, from: Hash, to: Hash) -> Result<bool> {
    is_ancestor(odb, from, to).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use webgit_core::hash::HashAlgo;
    use webgit_odb::{Commit, Signature};
    use webgit_storage::MemoryStore;

    fn odb() -> ObjectDatabase<MemoryStore> {
        ObjectDatabase::new(Arc::new(MemoryStore::new()), HashAlgo::Sha1)
    }

    fn sig(n: i64) -> Signature {
        Signature {
            name: "A".into(),
            email: "a@x".into(),
            seconds: n,
            tz_offset_seconds: 0,
        }
    }

    async fn commit(odb: &ObjectDatabase<MemoryStore>, parents: Vec<Hash>, seed: &str) -> Hash {
        let tree = webgit_core::hash::one_shot(HashAlgo::Sha1, seed.as_bytes());
        let commit = Commit {
            tree,
            parents,
            author: sig(1),
            committer: sig(1),
            message: format!("{seed}\n"),
        };
        odb.put(&Object::Commit(commit)).await.unwrap()
    }

    #[tokio::test]
    async fn linear_history_base_is_the_older_commit() {
        let odb = odb();
        let c1 = commit(&odb, vec![], "c1").await;
        let c2 = commit(&odb, vec![c1], "c2").await;
        let c3 = commit(&odb, vec![c2], "c3").await;
        assert_eq!(merge_base(&odb, c1, c3).await.unwrap(), c1);
        assert!(can_fast_forward(&odb, c1, c3).await.unwrap());
        assert!(!can_fast_forward(&odb, c3, c1).await.unwrap());
    }

    #[tokio::test]
    async fn diverged_branches_share_the_fork_point() {
        let odb = odb();
        let base = commit(&odb, vec![], "base").await;
        let ours = commit(&odb, vec![base], "ours").await;
        let theirs = commit(&odb, vec![base], "theirs").await;
        assert_eq!(merge_base(&odb, ours, theirs).await.unwrap(), base);
        assert!(!can_fast_forward(&odb, ours, theirs).await.unwrap());
    }

    #[tokio::test]
    async fn merge_commit_base_is_nearest_common_ancestor() {
        let odb = odb();
        let base = commit(&odb, vec![], "base").await;
        let ours = commit(&odb, vec![base], "ours").await;
        let theirs = commit(&odb, vec![base], "theirs").await;
        let merge = commit(&odb, vec![ours, theirs], "merge").await;
        assert_eq!(merge_base(&odb, merge, theirs).await.unwrap(), theirs);
    }

    #[tokio::test]
    async fn disconnected_histories_have_no_common_ancestor() {
        let odb = odb();
        let a = commit(&odb, vec![], "a").await;
        let b = commit(&odb, vec![], "b").await;
        let err = merge_base(&odb, a, b).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn merging_a_commit_with_itself_is_its_own_base() {
        let odb = odb();
        let c = commit(&odb, vec![], "solo").await;
        assert_eq!(merge_base(&odb, c, c).await.unwrap(), c);
    }

    proptest::proptest! {
        #[test]
        fn fast_forward_agrees_with_ancestry(depth in 1usize..6) {
            tokio::runtime::Runtime::new().unwrap().block_on(async move {
                let odb = odb();
                let mut tip = commit(&odb, vec![], "root").await;
                let root = tip;
                for i in 0..depth {
                    tip = commit(&odb, vec![tip], &format!("c{i}")).await;
                }
                assert!(can_fast_forward(&odb, root, tip).await.unwrap());
                assert!(is_ancestor(&odb, root, tip).await.unwrap());
            });
        }
    }
}
