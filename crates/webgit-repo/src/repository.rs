//! The `Repository` struct: construction, staging, committing, branch
//! management, and the single write lock that serializes every mutating
//! operation (§5).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use webgit_core::hash::HashAlgo;
use webgit_core::{Error, Result};
use webgit_core::{Hash, RepoConfig};
use webgit_index::{AddOptions, IgnoreSet, Index, WorkingTree};
use webgit_odb::{Commit, Object, ObjectDatabase, Signature};
use webgit_refs::{Expected, RefStore, RefTarget};
use webgit_status::Status;
use webgit_storage::BlobStore;

const CONFIG_KEY: &str = "config";
const INDEX_KEY: &str = "index";
const HEAD_KEY: &str = "HEAD";

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn branch_ref(name: &str) -> String {
    format!("refs/heads/{name}")
}

/// A client-side Git repository: the object database, reference store,
/// and staging area bound to one blob store, behind a single writer
/// lock (§5).
pub struct Repository<S: BlobStore> {
    pub(crate) store: Arc<S>,
    pub(crate) odb: ObjectDatabase<S>,
    pub(crate) refs: RefStore<S>,
    pub(crate) config: parking_lot::RwLock<RepoConfig>,
    pub(crate) working_tree: Option<Arc<dyn WorkingTree>>,
    pub(crate) ignore: IgnoreSet,
    /// The repository-level write lock (§5): writers take `.write()`,
    /// readers take `.read()`. The guarded unit carries no state of its
    /// own — every operation's real state lives in the blob store.
    pub(crate) lock: tokio::sync::RwLock<()>,
}

impl<S: BlobStore> Repository<S> {
    /// Initializes a new repository against an empty store: writes
    /// `config`, an empty `index`, and a `HEAD` symbolic to the not-yet-
    /// existent default branch.
    ///
    /// Fails with [`Error::AlreadyExists`] if `HEAD` is already present.
    pub async fn init(
        store: Arc<S>,
        config: RepoConfig,
        working_tree: Option<Arc<dyn WorkingTree>>,
    ) -> Result<Self> {
        if store.exists(HEAD_KEY).await.map_err(Error::from)? {
            return Err(Error::AlreadyExists(
                "repository already initialized (HEAD exists)".to_string(),
            ));
        }
        let algo = config.hash_algorithm;
        let default_branch = config.default_branch.clone();
        store
            .set(CONFIG_KEY, config.to_text().into_bytes().into())
            .await
            .map_err(Error::from)?;

        let odb = ObjectDatabase::new(store.clone(), algo);
        let refs = RefStore::new(store.clone(), algo);
        refs.write(
            HEAD_KEY,
            RefTarget::Symbolic(branch_ref(&default_branch)),
            Expected::Absent,
        )
        .await?;

        let index = Index::new();
        store
            .set(INDEX_KEY, index.save()?.into())
            .await
            .map_err(Error::from)?;

        Ok(Self {
            store,
            odb,
            refs,
            config: parking_lot::RwLock::new(config),
            working_tree,
            ignore: IgnoreSet::empty(),
            lock: tokio::sync::RwLock::new(()),
        })
    }

    /// Opens a repository previously created by [`Self::init`]. Fails
    /// with [`Error::NotARepo`] if `config` is missing.
    pub async fn open(store: Arc<S>, working_tree: Option<Arc<dyn WorkingTree>>) -> Result<Self> {
        let config_bytes = store
            .get(CONFIG_KEY)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_a_repo("no config blob present"))?;
        let config_text =
            std::str::from_utf8(&config_bytes).map_err(|_| Error::malformed("config is not utf8"))?;
        let config = RepoConfig::parse(config_text)?;
        let algo = config.hash_algorithm;

        Ok(Self {
            odb: ObjectDatabase::new(store.clone(), algo),
            refs: RefStore::new(store.clone(), algo),
            store,
            config: parking_lot::RwLock::new(config),
            working_tree,
            ignore: IgnoreSet::empty(),
            lock: tokio::sync::RwLock::new(()),
        })
    }

    /// Replaces the ignore-pattern set `add`/`status` use to filter the
    /// working tree.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    /// The configured hash algorithm.
    #[must_use]
    pub fn hash_algo(&self) -> HashAlgo {
        self.config.read().hash_algorithm
    }

    /// Direct read access to the underlying object database, for callers
    /// that need to inspect a tree or blob by hash (e.g. a best-effort
    /// merged tree that was never committed).
    #[must_use]
    pub fn odb(&self) -> &ObjectDatabase<S> {
        &self.odb
    }

    pub(crate) async fn load_index(&self) -> Result<Index> {
        match self.store.get(INDEX_KEY).await.map_err(Error::from)? {
            Some(bytes) => Index::load(&bytes),
            None => Ok(Index::new()),
        }
    }

    pub(crate) async fn save_index(&self, index: &Index) -> Result<()> {
        self.store
            .set(INDEX_KEY, index.save()?.into())
            .await
            .map_err(Error::from)
    }

    pub(crate) fn require_working_tree(&self) -> Result<&dyn WorkingTree> {
        self.working_tree
            .as_deref()
            .ok_or_else(|| Error::invalid_name("operation requires a working tree; repository is bare"))
    }

    /// Stages `paths` (exact paths or glob patterns) from the working
    /// tree into the index.
    pub async fn add(&self, paths: &[String], opts: AddOptions, cancel: &CancellationToken) -> Result<()> {
        check_cancelled(cancel)?;
        let _guard = self.lock.write().await;
        let working_tree = self.require_working_tree()?;
        let mut index = self.load_index().await?;
        check_cancelled(cancel)?;
        index.add(paths, opts, working_tree, &self.ignore, &self.odb).await?;
        check_cancelled(cancel)?;
        self.save_index(&index).await
    }

    /// Unstages `paths`, removing them from the index entirely (not just
    /// from the working tree). A path not currently staged is ignored.
    pub async fn remove(&self, paths: &[String], cancel: &CancellationToken) -> Result<()> {
        check_cancelled(cancel)?;
        let _guard = self.lock.write().await;
        let mut index = self.load_index().await?;
        for path in paths {
            index.remove(path);
        }
        self.save_index(&index).await
    }

    /// Resolves `HEAD`'s branch name (`None` if detached) and the
    /// commit it currently points at (`None` for an unborn branch).
    pub(crate) async fn current_branch_and_parent(&self) -> Result<(Option<String>, Option<Hash>)> {
        let head = self.refs.read(HEAD_KEY).await?;
        match head {
            RefTarget::Symbolic(branch) => match self.refs.read(&branch).await {
                Ok(RefTarget::Direct(hash)) => Ok((Some(branch), Some(hash))),
                Ok(RefTarget::Symbolic(_)) => Err(Error::malformed("a branch ref must be direct")),
                Err(Error::NotFound(_)) => Ok((Some(branch), None)),
                Err(e) => Err(e),
            },
            RefTarget::Direct(hash) => Ok((None, Some(hash))),
        }
    }

    /// Resolves `HEAD` to a commit hash, if one exists yet.
    pub async fn head_commit(&self) -> Result<Option<Hash>> {
        Ok(self.current_branch_and_parent().await?.1)
    }

    /// The branch `HEAD` currently points at, or `None` if detached.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let head = self.refs.read(HEAD_KEY).await?;
        Ok(match head {
            RefTarget::Symbolic(branch) => Some(
                branch
                    .strip_prefix("refs/heads/")
                    .map_or(branch.clone(), str::to_string),
            ),
            RefTarget::Direct(_) => None,
        })
    }

    /// Every local branch name and the commit it points at.
    pub async fn list_branches(&self) -> Result<Vec<(String, Hash)>> {
        let entries = self.refs.list("refs/heads/").await?;
        Ok(entries
            .into_iter()
            .map(|(name, hash)| (name.strip_prefix("refs/heads/").unwrap_or(&name).to_string(), hash))
            .collect())
    }

    /// Creates `name` pointing at `at`, or at the current `HEAD` commit
    /// if `at` is `None`.
    pub async fn create_branch(&self, name: &str, at: Option<Hash>) -> Result<()> {
        let _guard = self.lock.write().await;
        let target = match at {
            Some(hash) => hash,
            None => self
                .head_commit()
                .await?
                .ok_or_else(|| Error::invalid_name("cannot branch: HEAD has no commit yet"))?,
        };
        self.refs
            .write(&branch_ref(name), RefTarget::Direct(target), Expected::Absent)
            .await
    }

    /// Moves `HEAD` to point at branch `name` (must already exist).
    pub async fn checkout_branch(&self, name: &str) -> Result<()> {
        let _guard = self.lock.write().await;
        let full = branch_ref(name);
        self.refs.resolve(&full).await?;
        self.refs.write(HEAD_KEY, RefTarget::Symbolic(full), Expected::Any).await
    }

    /// Detaches `HEAD` to point directly at `commit`.
    pub async fn checkout_commit(&self, commit: Hash) -> Result<()> {
        let _guard = self.lock.write().await;
        self.odb.get(&commit).await.and_then(|obj| match obj {
            Object::Commit(_) => Ok(()),
            other => Err(Error::malformed(format!("{commit} is not a commit (found {:?})", other.kind()))),
        })?;
        self.refs.write(HEAD_KEY, RefTarget::Direct(commit), Expected::Any).await
    }

    pub(crate) fn default_signature(&self) -> Result<Signature> {
        let config = self.config.read();
        let name = config
            .user_name
            .clone()
            .ok_or_else(|| Error::invalid_name("no author given and no user.name configured"))?;
        let email = config
            .user_email
            .clone()
            .ok_or_else(|| Error::invalid_name("no author given and no user.email configured"))?;
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Signature {
            name,
            email,
            seconds,
            tz_offset_seconds: 0,
        })
    }

    /// Writes the staged index to a tree and creates a commit over it,
    /// advancing the current branch (or `HEAD` directly, if detached).
    pub async fn commit(
        &self,
        message: &str,
        author: Option<Signature>,
        cancel: &CancellationToken,
    ) -> Result<Hash> {
        check_cancelled(cancel)?;
        let _guard = self.lock.write().await;
        let index = self.load_index().await?;
        check_cancelled(cancel)?;
        let tree = index.write_tree(&self.odb).await?;
        check_cancelled(cancel)?;

        let (branch, parent) = self.current_branch_and_parent().await?;
        let signature = match author {
            Some(sig) => sig,
            None => self.default_signature()?,
        };
        let commit = Commit {
            tree,
            parents: parent.into_iter().collect(),
            author: signature.clone(),
            committer: signature,
            message: message.to_string(),
        };
        let commit_hash = self.odb.put(&Object::Commit(commit)).await?;
        check_cancelled(cancel)?;

        let expected = match parent {
            Some(hash) => Expected::Value(RefTarget::Direct(hash)),
            None => Expected::Absent,
        };
        match &branch {
            Some(branch) => self.refs.write(branch, RefTarget::Direct(commit_hash), expected).await?,
            None => self.refs.write(HEAD_KEY, RefTarget::Direct(commit_hash), expected).await?,
        }
        tracing::info!(commit = %commit_hash, "created commit");
        Ok(commit_hash)
    }

    /// Computes working-tree status against the index and `HEAD` tree.
    pub async fn status(&self, cancel: &CancellationToken) -> Result<Status> {
        check_cancelled(cancel)?;
        let _guard = self.lock.write().await;
        let working_tree = self.require_working_tree()?;
        let mut index = self.load_index().await?;
        let head_tree = match self.head_commit().await? {
            Some(hash) => match self.odb.get(&hash).await? {
                Object::Commit(commit) => Some(commit.tree),
                other => return Err(Error::malformed(format!("HEAD is not a commit (found {:?})", other.kind()))),
            },
            None => None,
        };
        let result = webgit_status::status(&self.odb, &mut index, head_tree, working_tree, &self.ignore).await?;
        self.save_index(&index).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use webgit_index::MemoryWorkingTree;
    use webgit_storage::MemoryStore;

    use super::*;

    fn config() -> RepoConfig {
        let mut cfg = RepoConfig::default();
        cfg.user_name = Some("A".to_string());
        cfg.user_email = Some("a@x".to_string());
        cfg
    }

    #[tokio::test]
    async fn open_without_init_is_not_a_repo() {
        let store = Arc::new(MemoryStore::new());
        let err = Repository::open(store, None).await.unwrap_err();
        assert_eq!(err.code(), webgit_core::error::Code::NotARepo);
    }

    #[tokio::test]
    async fn init_twice_fails() {
        let store = Arc::new(MemoryStore::new());
        Repository::init(store.clone(), config(), None).await.unwrap();
        let err = Repository::init(store, config(), None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn first_commit_is_parent_free_and_updates_main() {
        let store = Arc::new(MemoryStore::new());
        let tree = Arc::new(MemoryWorkingTree::new());
        let repo = Repository::init(store, config(), Some(tree.clone())).await.unwrap();
        tree.write_file("a", "1\n");
        repo.add(&["a".to_string()], AddOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        let commit_hash = repo
            .commit("first\n", None, &CancellationToken::new())
            .await
            .unwrap();
        let Object::Commit(commit) = repo.odb.get(&commit_hash).await.unwrap() else {
            panic!("expected a commit");
        };
        assert!(commit.parents.is_empty());
        assert_eq!(repo.current_branch().await.unwrap(), Some("main".to_string()));
        assert_eq!(repo.head_commit().await.unwrap(), Some(commit_hash));
    }

    #[tokio::test]
    async fn create_branch_without_head_commit_fails() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::init(store, config(), None).await.unwrap();
        let err = repo.create_branch("feature", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[tokio::test]
    async fn checkout_unknown_branch_fails() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::init(store, config(), None).await.unwrap();
        assert!(repo.checkout_branch("does-not-exist").await.is_err());
    }
}
