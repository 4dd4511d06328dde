//! HEAD, branches, and tags: the reference store (C4).
//!
//! References are stored one blob-store key per ref: `refs/heads/<name>`,
//! `refs/tags/<name>`, `refs/remotes/<remote>/<name>`, and `HEAD`. The
//! value is either a hex hash (a direct ref) or the text `ref: <name>` (a
//! symbolic ref), exactly the external key/value contract of §6.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use webgit_core::hash::HashAlgo;
use webgit_core::refname;
use webgit_core::{Error, Hash, Result};
use webgit_storage::BlobStore;

/// The maximum number of symbolic hops `resolve` will follow before
/// declaring the chain too deep.
pub const MAX_SYMBOLIC_DEPTH: usize = 10;

const SYMBOLIC_PREFIX: &str = "ref: ";

/// What a reference currently points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// Points directly at a commit hash.
    Direct(Hash),
    /// Points at another reference by name.
    Symbolic(String),
}

impl RefTarget {
    fn encode(&self) -> String {
        match self {
            Self::Direct(hash) => hash.to_hex(),
            Self::Symbolic(name) => format!("{SYMBOLIC_PREFIX}{name}"),
        }
    }

    fn decode(text: &str, algo: HashAlgo) -> Result<Self> {
        let text = text.trim();
        if let Some(name) = text.strip_prefix(SYMBOLIC_PREFIX) {
            Ok(Self::Symbolic(name.to_string()))
        } else {
            Ok(Self::Direct(Hash::from_hex(algo, text)?))
        }
    }
}

/// What the caller expects the current value of a ref to be, for a
/// compare-and-set [`RefStore::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// Write unconditionally, regardless of the current value.
    Any,
    /// The ref must not currently exist.
    Absent,
    /// The ref must currently hold exactly this target.
    Value(RefTarget),
}

/// The reference store: HEAD, branches, and tags, with atomic updates.
///
/// The backing [`BlobStore`] exposes no native compare-and-swap, so this
/// store serializes its own read-check-write sequence behind an internal
/// lock: it is the linearization point described in §5, and `write` is
/// the only way to mutate a ref.
pub struct RefStore<S: BlobStore> {
    store: Arc<S>,
    algo: HashAlgo,
    cas_lock: tokio::sync::Mutex<()>,
}

impl<S: BlobStore> RefStore<S> {
    /// Wraps a blob store as a reference store using the repository's
    /// configured hash algorithm.
    #[must_use]
    pub fn new(store: Arc<S>, algo: HashAlgo) -> Self {
        Self {
            store,
            algo,
            cas_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Reads the raw target of `name` (does not follow symbolic refs).
    pub async fn read(&self, name: &str) -> Result<RefTarget> {
        refname::validate(name)?;
        let bytes = self
            .store
            .get(name)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("ref {name}")))?;
        let text = std::str::from_utf8(&bytes).map_err(|_| Error::malformed("ref value is not utf8"))?;
        RefTarget::decode(text, self.algo)
    }

    /// Writes `target` to `name`. `expected` governs the compare-and-set
    /// semantics; a losing CAS returns [`Error::RefUpdateConflict`] and
    /// leaves the store untouched.
    pub async fn write(&self, name: &str, target: RefTarget, expected: Expected) -> Result<()> {
        refname::validate(name)?;
        if let RefTarget::Symbolic(target_name) = &target {
            refname::validate(target_name)?;
        }
        let _guard = self.cas_lock.lock().await;
        let current = self.read(name).await;
        let satisfied = match (&expected, &current) {
            (Expected::Any, _) => true,
            (Expected::Absent, Err(Error::NotFound(_))) => true,
            (Expected::Absent, _) => false,
            (Expected::Value(want), Ok(have)) => want == have,
            (Expected::Value(_), Err(_)) => false,
        };
        if !satisfied {
            tracing::warn!(ref_name = name, "CAS ref update lost the race");
            return Err(Error::RefUpdateConflict(name.to_string()));
        }
        self.store
            .set(name, target.encode().into_bytes().into())
            .await
            .map_err(Error::from)?;
        tracing::debug!(ref_name = name, "ref updated");
        Ok(())
    }

    /// Deletes `name`, if present. Deleting an absent ref is not an
    /// error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        refname::validate(name)?;
        self.store.delete(name).await.map_err(Error::from)
    }

    /// Lists every ref whose name starts with `prefix`, resolved to a
    /// direct hash. Symbolic refs among the matches are followed; refs
    /// that fail to resolve (dangling, cyclic) are skipped.
    pub async fn list(&self, prefix: &str) -> Result<Vec<(String, Hash)>> {
        let keys = self.store.list(prefix).await.map_err(Error::from)?;
        let mut out = Vec::new();
        for key in keys {
            if let Ok(hash) = self.resolve(&key).await {
                out.push((key, hash));
            }
        }
        Ok(out)
    }

    /// Resolves `name` to a commit hash, following symbolic refs up to
    /// [`MAX_SYMBOLIC_DEPTH`] hops. Fails with a malformed-ref error on a
    /// cycle or an overly deep chain.
    pub async fn resolve(&self, name: &str) -> Result<Hash> {
        let mut current = name.to_string();
        let mut seen = Vec::new();
        for _ in 0..MAX_SYMBOLIC_DEPTH {
            if seen.contains(&current) {
                return Err(Error::malformed(format!("cyclic reference starting at {name}")));
            }
            seen.push(current.clone());
            match self.read(&current).await? {
                RefTarget::Direct(hash) => return Ok(hash),
                RefTarget::Symbolic(next) => current = next,
            }
        }
        Err(Error::malformed(format!(
            "reference chain starting at {name} exceeds {MAX_SYMBOLIC_DEPTH} hops"
        )))
    }
}
