//! The staging area: a sorted vector of path entries sitting between the
//! working tree and the next commit (C5).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use webgit_core::hash::HashAlgo;
use webgit_core::{Error, Hash, Result};
use webgit_odb::{FileMode, Object, ObjectDatabase, Tree, TreeEntry};
use webgit_storage::BlobStore;

use crate::ignore::IgnoreSet;
use crate::working_tree::WorkingTree;

/// One staged path: its mode, content hash, and cached stat info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Repository-relative path, forward-slash separated.
    pub path: String,
    /// The file's mode.
    pub mode: FileMode,
    /// The blob hash of the file's staged content.
    pub hash: Hash,
    /// Cached file size, in bytes.
    pub size: u64,
    /// Cached modification time, nanoseconds since the Unix epoch.
    pub mtime_ns: i64,
    /// Cached status-change time, nanoseconds since the Unix epoch.
    pub ctime_ns: i64,
    /// Reserved for future use (e.g. stage number during an unresolved
    /// merge); always `0` outside of that.
    pub flags: u32,
}

/// Options governing [`Index::add`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Bypass ignore rules.
    pub force: bool,
    /// Only refresh entries that already exist; never add new paths.
    pub update_only: bool,
}

/// Validates an index path: relative, forward-slash separated, no `.`
/// or `..` segments.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() || path.starts_with('/') {
        return Err(Error::invalid_name(format!(
            "index path must be relative and non-empty: '{path}'"
        )));
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::invalid_name(format!(
                "index path must not contain '.' or '..' segments: '{path}'"
            )));
        }
    }
    Ok(())
}

/// The staging area.
#[derive(Debug, Clone, Default)]
pub struct Index {
    /// Entries, always kept sorted by `path` with unique paths.
    entries: Vec<IndexEntry>,
}

impl Index {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view over the staged entries, in sorted order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Looks up the entry at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    fn upsert(&mut self, entry: IndexEntry) {
        match self.entries.binary_search_by(|e| e.path.cmp(&entry.path)) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Removes the entry at `path`, if present, returning it.
    pub fn remove(&mut self, path: &str) -> Option<IndexEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| self.entries.remove(i))
    }

    /// Empties the index.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Refreshes the cached stat fields of an existing entry without
    /// touching its staged hash. Used by status computation (C6) to
    /// opportunistically update stale stat info once it has confirmed
    /// the working-tree content still hashes the same.
    pub fn refresh_stat(&mut self, path: &str, stat: crate::working_tree::FileStat) {
        if let Ok(i) = self.entries.binary_search_by(|e| e.path.as_str().cmp(path)) {
            let entry = &mut self.entries[i];
            entry.size = stat.size;
            entry.mtime_ns = stat.mtime_ns;
            entry.ctime_ns = stat.ctime_ns;
            entry.mode = stat.mode;
        }
    }

    /// Stages `specs` (exact paths or glob patterns) from `working_tree`
    /// into this index, hashing and storing each surviving file's
    /// content via `odb`.
    pub async fn add<S: BlobStore>(
        &mut self,
        specs: &[String],
        opts: AddOptions,
        working_tree: &(dyn WorkingTree),
        ignore: &IgnoreSet,
        odb: &ObjectDatabase<S>,
    ) -> Result<()> {
        let all_paths = working_tree.list_paths().await?;
        let mut matched: Vec<String> = Vec::new();
        for spec in specs {
            if spec.contains(['*', '?', '[']) {
                let pattern = glob::Pattern::new(spec)
                    .map_err(|e| Error::invalid_name(format!("bad path pattern '{spec}': {e}")))?;
                matched.extend(all_paths.iter().filter(|p| pattern.matches(p)).cloned());
            } else {
                matched.push(spec.clone());
            }
        }
        matched.sort();
        matched.dedup();

        for path in matched {
            validate_path(&path)?;
            if !opts.force && ignore.matches(&path) {
                continue;
            }
            let already_tracked = self.get(&path).is_some();
            if opts.update_only && !already_tracked {
                continue;
            }
            let Some(data) = working_tree.read(&path).await? else {
                continue;
            };
            let Some(stat) = working_tree.stat(&path).await? else {
                continue;
            };
            let hash = odb.put(&Object::Blob(data)).await?;
            self.upsert(IndexEntry {
                path,
                mode: stat.mode,
                hash,
                size: stat.size,
                mtime_ns: stat.mtime_ns,
                ctime_ns: stat.ctime_ns,
                flags: 0,
            });
        }
        Ok(())
    }

    /// Materializes the staged entries into a tree hierarchy, storing
    /// every directory (and the root) via `odb`, and returns the root
    /// tree's hash. An empty index produces the hash of the empty tree.
    pub async fn write_tree<S: BlobStore>(&self, odb: &ObjectDatabase<S>) -> Result<Hash> {
        write_tree_level(&self.entries, "", odb).await
    }

    /// Serializes this index to its repository-private on-disk form.
    pub fn save(&self) -> Result<Vec<u8>> {
        let records: Vec<Record> = self.entries.iter().map(Record::from).collect();
        serde_json::to_vec(&records).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes an index previously produced by [`Index::save`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let records: Vec<Record> =
            serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            entries.push(record.into_entry()?);
        }
        entries.sort_by(|a: &IndexEntry, b: &IndexEntry| a.path.cmp(&b.path));
        Ok(Self { entries })
    }
}

/// Recursively groups entries by their first path component and encodes
/// each group as a tree, bottom-up.
fn write_tree_level<'a, S: BlobStore>(
    entries: &'a [IndexEntry],
    prefix: &'a str,
    odb: &'a ObjectDatabase<S>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Hash>> + 'a>> {
    Box::pin(async move {
        let mut direct: Vec<&IndexEntry> = Vec::new();
        let mut by_dir: BTreeMap<&str, Vec<&IndexEntry>> = BTreeMap::new();

        for entry in entries {
            let rest = entry
                .path
                .strip_prefix(prefix)
                .expect("entries passed to this level share the prefix");
            match rest.split_once('/') {
                None => direct.push(entry),
                Some((dir, _)) => by_dir.entry(dir).or_default().push(entry),
            }
        }

        let mut tree_entries = Vec::new();
        for entry in &direct {
            let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
            tree_entries.push(TreeEntry {
                mode: entry.mode,
                name: name.to_string(),
                hash: entry.hash,
            });
        }
        for (dir, dir_entries) in &by_dir {
            let owned: Vec<IndexEntry> = dir_entries.iter().map(|e| (*e).clone()).collect();
            let child_prefix = format!("{prefix}{dir}/");
            let child_hash = write_tree_level(&owned, &child_prefix, odb).await?;
            tree_entries.push(TreeEntry {
                mode: FileMode::Dir,
                name: (*dir).to_string(),
                hash: child_hash,
            });
        }

        let tree = Tree::new(tree_entries);
        odb.put(&Object::Tree(tree)).await
    })
}

#[derive(Serialize, Deserialize)]
struct Record {
    path: String,
    mode: u32,
    hash: String,
    size: u64,
    mtime_ns: i64,
    ctime_ns: i64,
    flags: u32,
}

impl From<&IndexEntry> for Record {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            path: entry.path.clone(),
            mode: entry.mode.as_octal(),
            hash: entry.hash.to_hex(),
            size: entry.size,
            mtime_ns: entry.mtime_ns,
            ctime_ns: entry.ctime_ns,
            flags: entry.flags,
        }
    }
}

impl Record {
    fn into_entry(self) -> Result<IndexEntry> {
        let algo = match self.hash.len() {
            40 => HashAlgo::Sha1,
            64 => HashAlgo::Sha256,
            other => {
                return Err(Error::invalid_hash(format!(
                    "index record hash has unexpected length {other}"
                )))
            }
        };
        Ok(IndexEntry {
            path: self.path,
            mode: mode_from_octal(self.mode)?,
            hash: Hash::from_hex(algo, &self.hash)?,
            size: self.size,
            mtime_ns: self.mtime_ns,
            ctime_ns: self.ctime_ns,
            flags: self.flags,
        })
    }
}

fn mode_from_octal(mode: u32) -> Result<FileMode> {
    FileMode::parse(&format!("{mode:o}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use webgit_storage::MemoryStore;

    use crate::working_tree::MemoryWorkingTree;

    fn odb() -> ObjectDatabase<MemoryStore> {
        ObjectDatabase::new(Arc::new(MemoryStore::new()), HashAlgo::Sha1)
    }

    #[tokio::test]
    async fn add_stages_a_single_file() {
        let wt = MemoryWorkingTree::new();
        wt.write_file("README", "hi\n");
        let db = odb();
        let mut index = Index::new();
        index
            .add(
                &["README".to_string()],
                AddOptions::default(),
                &wt,
                &IgnoreSet::empty(),
                &db,
            )
            .await
            .unwrap();
        let entry = index.get("README").unwrap();
        assert_eq!(entry.hash.to_hex(), "45b983be36b73c0788dc9cbcb76cbb80fc7bb057");
    }

    #[tokio::test]
    async fn add_honors_ignore_rules_unless_forced() {
        let wt = MemoryWorkingTree::new();
        wt.write_file("build.log", "noise");
        let db = odb();
        let ignore = IgnoreSet::new(["*.log"]);
        let mut index = Index::new();
        index
            .add(&["build.log".to_string()], AddOptions::default(), &wt, &ignore, &db)
            .await
            .unwrap();
        assert!(index.get("build.log").is_none());

        index
            .add(
                &["build.log".to_string()],
                AddOptions { force: true, update_only: false },
                &wt,
                &ignore,
                &db,
            )
            .await
            .unwrap();
        assert!(index.get("build.log").is_some());
    }

    #[tokio::test]
    async fn update_only_skips_new_paths() {
        let wt = MemoryWorkingTree::new();
        wt.write_file("a.txt", "a");
        wt.write_file("b.txt", "b");
        let db = odb();
        let mut index = Index::new();
        index
            .add(&["a.txt".to_string()], AddOptions::default(), &wt, &IgnoreSet::empty(), &db)
            .await
            .unwrap();
        index
            .add(
                &["b.txt".to_string()],
                AddOptions { force: false, update_only: true },
                &wt,
                &IgnoreSet::empty(),
                &db,
            )
            .await
            .unwrap();
        assert!(index.get("a.txt").is_some());
        assert!(index.get("b.txt").is_none());
    }

    #[tokio::test]
    async fn glob_patterns_match_multiple_paths() {
        let wt = MemoryWorkingTree::new();
        wt.write_file("src/a.rs", "a");
        wt.write_file("src/b.rs", "b");
        wt.write_file("README", "r");
        let db = odb();
        let mut index = Index::new();
        index
            .add(&["src/*.rs".to_string()], AddOptions::default(), &wt, &IgnoreSet::empty(), &db)
            .await
            .unwrap();
        assert!(index.get("src/a.rs").is_some());
        assert!(index.get("src/b.rs").is_some());
        assert!(index.get("README").is_none());
    }

    #[tokio::test]
    async fn write_tree_groups_by_directory() {
        let wt = MemoryWorkingTree::new();
        wt.write_file("README", "hi\n");
        wt.write_file("src/main.rs", "fn main() {}");
        let db = odb();
        let mut index = Index::new();
        index
            .add(
                &["README".to_string(), "src/main.rs".to_string()],
                AddOptions::default(),
                &wt,
                &IgnoreSet::empty(),
                &db,
            )
            .await
            .unwrap();
        let root_hash = index.write_tree(&db).await.unwrap();
        let root = db.get(&root_hash).await.unwrap();
        let Object::Tree(tree) = root else { panic!("expected tree") };
        assert_eq!(tree.entries.len(), 2);
        assert!(tree.get("README").is_some());
        let src_entry = tree.get("src").unwrap();
        assert!(src_entry.mode.is_dir());
    }

    #[tokio::test]
    async fn empty_index_writes_empty_tree() {
        let db = odb();
        let index = Index::new();
        let hash = index.write_tree(&db).await.unwrap();
        let Object::Tree(tree) = db.get(&hash).await.unwrap() else { panic!("expected tree") };
        assert!(tree.entries.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut index = Index::new();
        index.upsert(IndexEntry {
            path: "a.txt".into(),
            mode: FileMode::Regular,
            hash: webgit_core::hash::one_shot(HashAlgo::Sha1, b"x"),
            size: 1,
            mtime_ns: 10,
            ctime_ns: 10,
            flags: 0,
        });
        let bytes = index.save().unwrap();
        let loaded = Index::load(&bytes).unwrap();
        assert_eq!(loaded.entries(), index.entries());
    }

    #[test]
    fn rejects_dotdot_paths() {
        assert!(validate_path("a/../b").is_err());
        assert!(validate_path("/abs").is_err());
        assert!(validate_path("ok/path.txt").is_ok());
    }

    proptest::proptest! {
        #[test]
        fn entries_stay_sorted_and_unique(paths in proptest::collection::vec("[a-z]{1,6}", 0..12)) {
            let mut index = Index::new();
            for p in paths {
                index.upsert(IndexEntry {
                    path: p,
                    mode: FileMode::Regular,
                    hash: webgit_core::hash::one_shot(HashAlgo::Sha1, b"x"),
                    size: 0,
                    mtime_ns: 0,
                    ctime_ns: 0,
                    flags: 0,
                });
            }
            let paths: Vec<&str> = index.entries().iter().map(|e| e.path.as_str()).collect();
            let mut sorted = paths.clone();
            sorted.sort_unstable();
            sorted.dedup();
            proptest::prop_assert_eq!(paths.len(), sorted.len());
            proptest::prop_assert_eq!(paths, sorted);
        }
    }
}
