//! The content-addressed object database (C3): compress on write, verify
//! on read, dedupe by hash.

use std::sync::Arc;

use webgit_core::hash::HashAlgo;
use webgit_core::{Error, Hash, Result};
use webgit_storage::BlobStore;

use crate::compression::{compress, decompress};
use crate::object::{Object, ObjectKind};

fn object_key(hash: &Hash) -> String {
    format!("objects/{}", hash.to_hex())
}

/// Content-addressed store over a [`BlobStore`]. `put` is idempotent by
/// hash; `get` verifies the decoded header size against the payload and,
/// when `strict_verify` is enabled, recomputes and checks the hash.
pub struct ObjectDatabase<S: BlobStore> {
    store: Arc<S>,
    algo: HashAlgo,
    strict_verify: bool,
}

impl<S: BlobStore> ObjectDatabase<S> {
    /// Wraps a blob store as an object database using the repository's
    /// configured hash algorithm.
    #[must_use]
    pub fn new(store: Arc<S>, algo: HashAlgo) -> Self {
        Self {
            store,
            algo,
            strict_verify: true,
        }
    }

    /// Disables post-decode hash re-verification (the header-size check
    /// still always runs). Intended for read-mostly paths where the
    /// caller already trusts the store's integrity.
    #[must_use]
    pub fn without_strict_verify(mut self) -> Self {
        self.strict_verify = false;
        self
    }

    /// Encodes, hashes, compresses, and stores `object`. Returns the
    /// object's hash whether or not it was already present; a second
    /// `put` of byte-identical content never rewrites the store.
    pub async fn put(&self, object: &Object) -> Result<Hash> {
        let hash = object.hash(self.algo);
        let key = object_key(&hash);
        if self.store.exists(&key).await.map_err(Error::from)? {
            tracing::trace!(hash = %hash, "object already present, skipping write");
            return Ok(hash);
        }
        let payload = object.encode_payload();
        let mut framed = Vec::with_capacity(payload.len() + 32);
        framed.extend_from_slice(object.kind().as_str().as_bytes());
        framed.push(b' ');
        framed.extend_from_slice(payload.len().to_string().as_bytes());
        framed.push(0);
        framed.extend_from_slice(&payload);
        let compressed = compress(&framed)?;
        self.store
            .set(&key, compressed.into())
            .await
            .map_err(Error::from)?;
        tracing::debug!(hash = %hash, kind = ?object.kind(), "stored object");
        Ok(hash)
    }

    /// Loads and verifies the object at `hash`.
    pub async fn get(&self, hash: &Hash) -> Result<Object> {
        let key = object_key(hash);
        let compressed = self
            .store
            .get(&key)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("object {hash}")))?;
        let framed = decompress(&compressed)?;
        let nul = framed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed("object header missing NUL terminator"))?;
        let header = std::str::from_utf8(&framed[..nul])
            .map_err(|_| Error::malformed("object header is not utf8"))?;
        let (type_word, size_word) = header
            .split_once(' ')
            .ok_or_else(|| Error::malformed("object header missing size"))?;
        let kind = ObjectKind::parse(type_word)?;
        let declared_size: usize = size_word
            .parse()
            .map_err(|_| Error::malformed("object header size is not numeric"))?;
        let payload = &framed[nul + 1..];
        if payload.len() != declared_size {
            return Err(Error::SizeMismatch {
                expected: declared_size,
                actual: payload.len(),
            });
        }
        let object = Object::decode(kind, payload, self.algo)?;
        if self.strict_verify {
            let actual = object.hash(self.algo);
            if &actual != hash {
                return Err(Error::corrupt(format!(
                    "hash mismatch: requested {hash}, decoded content hashes to {actual}"
                )));
            }
        }
        Ok(object)
    }

    /// True if an object with this hash is present.
    pub async fn has(&self, hash: &Hash) -> Result<bool> {
        self.store
            .exists(&object_key(hash))
            .await
            .map_err(Error::from)
    }

    /// Removes the object at `hash`, if present.
    pub async fn delete(&self, hash: &Hash) -> Result<()> {
        self.store
            .delete(&object_key(hash))
            .await
            .map_err(Error::from)
    }

    /// Lists the hashes of every stored object.
    pub async fn list(&self) -> Result<Vec<Hash>> {
        let keys = self.store.list("objects/").await.map_err(Error::from)?;
        keys.iter()
            .map(|key| {
                let hex = key
                    .strip_prefix("objects/")
                    .ok_or_else(|| Error::corrupt(format!("unexpected object key '{key}'")))?;
                Hash::from_hex(self.algo, hex)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use webgit_storage::MemoryStore;

    fn db() -> ObjectDatabase<MemoryStore> {
        ObjectDatabase::new(Arc::new(MemoryStore::new()), HashAlgo::Sha1)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let db = db();
        let obj = Object::Blob(Bytes::from_static(b"hi\n"));
        let hash = db.put(&obj).await.unwrap();
        assert_eq!(hash.to_hex(), "45b983be36b73c0788dc9cbcb76cbb80fc7bb057");
        let loaded = db.get(&hash).await.unwrap();
        assert_eq!(loaded, obj);
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let db = db();
        let obj = Object::Blob(Bytes::from_static(b"same content"));
        let h1 = db.put(&obj).await.unwrap();
        let h2 = db.put(&obj).await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(db.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let db = db();
        let hash = webgit_core::hash::one_shot(HashAlgo::Sha1, b"nope");
        let err = db.get(&hash).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn has_and_delete() {
        let db = db();
        let obj = Object::Blob(Bytes::from_static(b"x"));
        let hash = db.put(&obj).await.unwrap();
        assert!(db.has(&hash).await.unwrap());
        db.delete(&hash).await.unwrap();
        assert!(!db.has(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_store_entry_is_rejected_as_corrupt() {
        let store = Arc::new(MemoryStore::new());
        let db = ObjectDatabase::new(store.clone(), HashAlgo::Sha1);
        let obj = Object::Blob(Bytes::from_static(b"x"));
        let hash = db.put(&obj).await.unwrap();
        let key = object_key(&hash);
        store.set(&key, Bytes::from_static(b"garbage")).await.unwrap();
        let err = db.get(&hash).await.unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }
}
