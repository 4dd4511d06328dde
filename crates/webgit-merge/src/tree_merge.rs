//! Three-way tree merge (§4.7.2): per-entry truth table, recursive
//! descent into matching directories, and conflict synthesis for the
//! divergent cases the table calls out.

use bytes::Bytes;
use webgit_core::{Error, Hash, Result};
use webgit_odb::{FileMode, Object, ObjectDatabase, Tree, TreeEntry};
use webgit_storage::BlobStore;

use crate::content_merge::{merge_content, ContentMergeOutcome};

/// What kind of conflict a [`Conflict`] represents. A directory/file
/// type clash at the same name is folded into [`ConflictKind::Content`]
/// since it has no dedicated kind of its own (documented in
/// `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Ours and theirs both changed the same path incompatibly (or one
    /// side's change is a directory/file type clash).
    Content,
    /// A NUL byte was seen in one of the three sides; no text merge was
    /// attempted.
    Binary,
    /// Both sides added the same new path with incompatible content.
    Add,
    /// One side deleted a path the other side modified.
    Delete,
}

/// One unresolved (or partially resolved) path from a tree merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Repository-relative path of the conflicting entry.
    pub path: String,
    /// The kind of conflict.
    pub kind: ConflictKind,
    /// The entry present at the merge base, if any.
    pub base: Option<Hash>,
    /// Our side's entry, if any.
    pub ours: Option<Hash>,
    /// Their side's entry, if any.
    pub theirs: Option<Hash>,
    /// True if the conflicting content looked binary.
    pub is_binary: bool,
}

/// The outcome of a three-way tree merge: a best-effort merged tree
/// (conflicting text files carry embedded conflict markers, exactly as
/// Git leaves them in the working tree) plus the list of paths that
/// still need resolution. An empty `conflicts` list means the merge is
/// clean.
#[derive(Debug, Clone)]
pub struct TreeMergeOutcome {
    /// The merged tree's hash. `None` only when every input tree was
    /// absent and every entry was dropped (the degenerate empty case).
    pub tree: Option<Hash>,
    /// Every path where ours and theirs diverged.
    pub conflicts: Vec<Conflict>,
}

async fn tree_entries<S: BlobStore>(odb: &ObjectDatabase<S>, hash: Option<Hash>) -> Result<Vec<TreeEntry>> {
    match hash {
        None => Ok(Vec::new()),
        Some(hash) => match odb.get(&hash).await? {
            Object::Tree(tree) => Ok(tree.entries),
            other => Err(Error::malformed(format!(
                "expected tree object at {hash}, found {:?}",
                other.kind()
            ))),
        },
    }
}

fn entries_eq(a: &Option<TreeEntry>, b: &Option<TreeEntry>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.mode == y.mode && x.hash == y.hash,
        _ => false,
    }
}

async fn blob_bytes<S: BlobStore>(odb: &ObjectDatabase<S>, hash: Hash) -> Result<Bytes> {
    match odb.get(&hash).await? {
        Object::Blob(data) => Ok(data),
        other => Err(Error::malformed(format!(
            "expected blob object at {hash}, found {:?}",
            other.kind()
        ))),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Merges three (possibly absent) trees, recursing into directories
/// that both sides still have, and collecting conflicts in `conflicts`.
#[allow(clippy::too_many_lines)]
pub async fn merge_trees<S: BlobStore>(
    odb: &ObjectDatabase<S>,
    base: Option<Hash>,
    ours: Option<Hash>,
    theirs: Option<Hash>,
    prefix: &str,
    conflicts: &mut Vec<Conflict>,
) -> Result<Option<Hash>> {
    let base_entries = tree_entries(odb, base).await?;
    let our_entries = tree_entries(odb, ours).await?;
    let their_entries = tree_entries(odb, theirs).await?;

    let mut names: Vec<&str> = Vec::new();
    for entries in [&base_entries, &our_entries, &their_entries] {
        for entry in entries {
            if !names.contains(&entry.name.as_str()) {
                names.push(entry.name.as_str());
            }
        }
    }
    names.sort_unstable();

    let find = |entries: &[TreeEntry], name: &str| entries.iter().find(|e| e.name == name).cloned();

    let mut merged_entries = Vec::new();

    for name in names {
        let b = find(&base_entries, name);
        let o = find(&our_entries, name);
        let t = find(&their_entries, name);
        let path = join_path(prefix, name);

        if entries_eq(&o, &t) {
            if let Some(entry) = o {
                merged_entries.push(entry);
            }
            continue;
        }

        let o_is_dir = o.as_ref().is_some_and(|e| e.mode.is_dir());
        let t_is_dir = t.as_ref().is_some_and(|e| e.mode.is_dir());

        if o_is_dir && t_is_dir {
            let b_hash = b.as_ref().filter(|e| e.mode.is_dir()).map(|e| e.hash);
            let merged = Box::pin(merge_trees(
                odb,
                b_hash,
                o.map(|e| e.hash),
                t.map(|e| e.hash),
                &path,
                conflicts,
            ))
            .await?;
            if let Some(hash) = merged {
                merged_entries.push(TreeEntry {
                    mode: FileMode::Dir,
                    name: name.to_string(),
                    hash,
                });
            }
            continue;
        }

        if entries_eq(&b, &o) {
            if let Some(entry) = t {
                merged_entries.push(entry);
            }
            continue;
        }
        if entries_eq(&b, &t) {
            if let Some(entry) = o {
                merged_entries.push(entry);
            }
            continue;
        }

        // Genuine divergence: ours and theirs disagree, and neither
        // matches base. Work out which conflict shape this is.
        if o.is_none() || t.is_none() {
            // delete/modify or modify/delete (§4.7.2 rows 6-7)
            conflicts.push(Conflict {
                path,
                kind: ConflictKind::Delete,
                base: b.as_ref().map(|e| e.hash),
                ours: o.as_ref().map(|e| e.hash),
                theirs: t.as_ref().map(|e| e.hash),
                is_binary: false,
            });
            // Keep whichever side still has content so the merged tree
            // stays materializable; the conflict record is what gates
            // the commit.
            if let Some(entry) = o.or(t) {
                merged_entries.push(entry);
            }
            continue;
        }

        let (o_entry, t_entry) = (o.unwrap(), t.unwrap());

        if o_is_dir != t_is_dir {
            conflicts.push(Conflict {
                path,
                kind: ConflictKind::Content,
                base: b.as_ref().map(|e| e.hash),
                ours: Some(o_entry.hash),
                theirs: Some(t_entry.hash),
                is_binary: false,
            });
            merged_entries.push(o_entry);
            continue;
        }

        // Both sides are files. Try a content merge.
        let base_bytes = match &b {
            Some(entry) => blob_bytes(odb, entry.hash).await?,
            None => Bytes::new(),
        };
        let our_bytes = blob_bytes(odb, o_entry.hash).await?;
        let their_bytes = blob_bytes(odb, t_entry.hash).await?;

        match merge_content(&base_bytes, &our_bytes, &their_bytes) {
            ContentMergeOutcome::Binary => {
                conflicts.push(Conflict {
                    path,
                    kind: if b.is_none() { ConflictKind::Add } else { ConflictKind::Binary },
                    base: b.as_ref().map(|e| e.hash),
                    ours: Some(o_entry.hash),
                    theirs: Some(t_entry.hash),
                    is_binary: true,
                });
                merged_entries.push(o_entry);
            }
            ContentMergeOutcome::Text { text, has_conflict } if has_conflict => {
                let merged_hash = odb.put(&Object::Blob(Bytes::from(text.into_bytes()))).await?;
                conflicts.push(Conflict {
                    path,
                    kind: if b.is_none() { ConflictKind::Add } else { ConflictKind::Content },
                    base: b.as_ref().map(|e| e.hash),
                    ours: Some(o_entry.hash),
                    theirs: Some(t_entry.hash),
                    is_binary: false,
                });
                merged_entries.push(TreeEntry {
                    mode: o_entry.mode,
                    name: name.to_string(),
                    hash: merged_hash,
                });
            }
            ContentMergeOutcome::Text { text, .. } => {
                let merged_hash = odb.put(&Object::Blob(Bytes::from(text.into_bytes()))).await?;
                merged_entries.push(TreeEntry {
                    mode: o_entry.mode,
                    name: name.to_string(),
                    hash: merged_hash,
                });
            }
        }
    }

    if merged_entries.is_empty() {
        return Ok(None);
    }
    let tree = Tree::new(merged_entries);
    Ok(Some(odb.put(&Object::Tree(tree)).await?))
}

/// Top-level entry point: merges three root trees and packages the
/// result as a [`TreeMergeOutcome`].
pub async fn merge<S: BlobStore>(
    odb: &ObjectDatabase<S>,
    base: Option<Hash>,
    ours: Option<Hash>,
    theirs: Option<Hash>,
) -> Result<TreeMergeOutcome> {
    let mut conflicts = Vec::new();
    let tree = merge_trees(odb, base, ours, theirs, "", &mut conflicts).await?;
    Ok(TreeMergeOutcome { tree, conflicts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use webgit_core::HashAlgo;
    use webgit_odb::FileMode;
    use webgit_storage::MemoryStore;

    fn odb() -> ObjectDatabase<MemoryStore> {
        ObjectDatabase::new(Arc::new(MemoryStore::new()), HashAlgo::Sha1)
    }

    async fn blob(odb: &ObjectDatabase<MemoryStore>, content: &str) -> Hash {
        odb.put(&Object::Blob(Bytes::from(content.to_string()))).await.unwrap()
    }

    async fn tree_with(odb: &ObjectDatabase<MemoryStore>, entries: Vec<TreeEntry>) -> Hash {
        odb.put(&Object::Tree(Tree::new(entries))).await.unwrap()
    }

    #[tokio::test]
    async fn identical_trees_merge_to_themselves() {
        let odb = odb();
        let blob_hash = blob(&odb, "hi\n").await;
        let tree = tree_with(
            &odb,
            vec![TreeEntry { mode: FileMode::Regular, name: "a".into(), hash: blob_hash }],
        )
        .await;
        let mut conflicts = Vec::new();
        let merged = merge_trees(&odb, Some(tree), Some(tree), Some(tree), "", &mut conflicts)
            .await
            .unwrap();
        assert!(conflicts.is_empty());
        assert_eq!(merged, Some(tree));
    }

    #[tokio::test]
    async fn only_ours_added_a_file() {
        let odb = odb();
        let base = tree_with(&odb, vec![]).await;
        let a = blob(&odb, "new\n").await;
        let ours = tree_with(
            &odb,
            vec![TreeEntry { mode: FileMode::Regular, name: "new.txt".into(), hash: a }],
        )
        .await;
        let mut conflicts = Vec::new();
        let merged = merge_trees(&odb, Some(base), Some(ours), Some(base), "", &mut conflicts)
            .await
            .unwrap()
            .unwrap();
        assert!(conflicts.is_empty());
        let Object::Tree(tree) = odb.get(&merged).await.unwrap() else { panic!() };
        assert!(tree.get("new.txt").is_some());
    }

    #[tokio::test]
    async fn delete_modify_conflict_is_recorded() {
        let odb = odb();
        let x1 = blob(&odb, "1\n").await;
        let x2 = blob(&odb, "2\n").await;
        let base = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "x".into(), hash: x1 }]).await;
        let ours = tree_with(&odb, vec![]).await; // deleted x
        let theirs = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "x".into(), hash: x2 }]).await;

        let mut conflicts = Vec::new();
        merge_trees(&odb, Some(base), Some(ours), Some(theirs), "", &mut conflicts)
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].path, "x");
        assert_eq!(conflicts[0].kind, ConflictKind::Delete);
    }

    #[tokio::test]
    async fn content_conflict_embeds_markers_in_merged_tree() {
        let odb = odb();
        let base_blob = blob(&odb, "a\nb\nc\n").await;
        let ours_blob = blob(&odb, "a\nB\nc\n").await;
        let theirs_blob = blob(&odb, "a\nB'\nc\n").await;
        let base = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "f".into(), hash: base_blob }]).await;
        let ours = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "f".into(), hash: ours_blob }]).await;
        let theirs = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "f".into(), hash: theirs_blob }]).await;

        let mut conflicts = Vec::new();
        let merged = merge_trees(&odb, Some(base), Some(ours), Some(theirs), "", &mut conflicts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Content);
        let Object::Tree(tree) = odb.get(&merged).await.unwrap() else { panic!() };
        let entry = tree.get("f").unwrap();
        let Object::Blob(data) = odb.get(&entry.hash).await.unwrap() else { panic!() };
        let text = String::from_utf8(data.to_vec()).unwrap();
        assert!(text.contains("<<<<<<< HEAD"));
        assert!(text.contains(">>>>>>> MERGE"));
    }

    #[tokio::test]
    async fn subdirectory_changes_recurse() {
        let odb = odb();
        let base_blob = blob(&odb, "1\n").await;
        let ours_blob = blob(&odb, "2\n").await;
        let base_sub = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "nested".into(), hash: base_blob }]).await;
        let ours_sub = tree_with(&odb, vec![TreeEntry { mode: FileMode::Regular, name: "nested".into(), hash: ours_blob }]).await;
        let base = tree_with(&odb, vec![TreeEntry { mode: FileMode::Dir, name: "dir".into(), hash: base_sub }]).await;
        let ours = tree_with(&odb, vec![TreeEntry { mode: FileMode::Dir, name: "dir".into(), hash: ours_sub }]).await;

        let mut conflicts = Vec::new();
        let merged = merge_trees(&odb, Some(base), Some(ours), Some(base), "", &mut conflicts)
            .await
            .unwrap()
            .unwrap();
        assert!(conflicts.is_empty());
        let Object::Tree(tree) = odb.get(&merged).await.unwrap() else { panic!() };
        let dir_entry = tree.get("dir").unwrap();
        let Object::Tree(sub) = odb.get(&dir_entry.hash).await.unwrap() else { panic!() };
        assert_eq!(sub.get("nested").unwrap().hash, ours_blob);
    }
}
