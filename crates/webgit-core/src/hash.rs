//! Content hashing: the `Hash` type, the per-repository algorithm choice,
//! and the incremental/one-shot hasher contract.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Which hash algorithm a repository was initialized with. Fixed for the
/// repository's lifetime; stored in `core.hashAlgorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgo {
    /// 20-byte SHA-1, Git's historical default.
    Sha1,
    /// 32-byte SHA-256.
    Sha256,
}

impl HashAlgo {
    /// The byte width of hashes produced by this algorithm.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Parses the `core.hashAlgorithm` config value.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(Error::invalid_name(format!(
                "unknown hash algorithm '{other}'"
            ))),
        }
    }

    /// Renders the config value for this algorithm.
    #[must_use]
    pub const fn as_config_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Returns the zero hash (all-zero bytes) for this algorithm, the
    /// sentinel that denotes absence (e.g. the parent of a root commit).
    #[must_use]
    pub fn zero(self) -> Hash {
        match self {
            Self::Sha1 => Hash::Sha1([0u8; 20]),
            Self::Sha256 => Hash::Sha256([0u8; 32]),
        }
    }
}

/// A content hash. The variant encodes the repository's configured
/// algorithm, so a `Hash` can never silently carry the wrong width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hash {
    /// A 20-byte SHA-1 digest.
    Sha1([u8; 20]),
    /// A 32-byte SHA-256 digest.
    Sha256([u8; 32]),
}

impl Hash {
    /// The algorithm this hash was produced with.
    #[must_use]
    pub const fn algo(&self) -> HashAlgo {
        match self {
            Self::Sha1(_) => HashAlgo::Sha1,
            Self::Sha256(_) => HashAlgo::Sha256,
        }
    }

    /// Returns the raw bytes of this hash.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b.as_slice(),
            Self::Sha256(b) => b.as_slice(),
        }
    }

    /// True if every byte is zero (the "absent" sentinel).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Lowercase hex rendering, two characters per byte.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Parses a hex string under a known algorithm, validating width.
    pub fn from_hex(algo: HashAlgo, s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::invalid_hash(e.to_string()))?;
        Self::from_bytes(algo, &bytes)
    }

    /// Builds a `Hash` from raw bytes under a known algorithm, validating
    /// width.
    pub fn from_bytes(algo: HashAlgo, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != algo.width() {
            return Err(Error::invalid_hash(format!(
                "expected {} bytes for {:?}, got {}",
                algo.width(),
                algo,
                bytes.len()
            )));
        }
        Ok(match algo {
            HashAlgo::Sha1 => {
                let mut arr = [0u8; 20];
                arr.copy_from_slice(bytes);
                Self::Sha1(arr)
            }
            HashAlgo::Sha256 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(bytes);
                Self::Sha256(arr)
            }
        })
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An incremental hash accumulator, for streaming content that should not
/// be materialized as one contiguous buffer before hashing.
pub enum Accumulator {
    /// Incremental SHA-1 state.
    Sha1(Sha1),
    /// Incremental SHA-256 state.
    Sha256(Sha256),
}

impl Accumulator {
    /// Starts a new incremental hash for the given algorithm.
    #[must_use]
    pub fn new(algo: HashAlgo) -> Self {
        match algo {
            HashAlgo::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgo::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    /// Feeds more bytes into the accumulator.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => Digest::update(h, data),
            Self::Sha256(h) => Digest::update(h, data),
        }
    }

    /// Consumes the accumulator, producing the final [`Hash`].
    #[must_use]
    pub fn finalize(self) -> Hash {
        match self {
            Self::Sha1(h) => {
                let out = h.finalize();
                let mut arr = [0u8; 20];
                arr.copy_from_slice(&out);
                Hash::Sha1(arr)
            }
            Self::Sha256(h) => {
                let out = h.finalize();
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&out);
                Hash::Sha256(arr)
            }
        }
    }
}

/// One-shot hash of a buffer under the given algorithm.
#[must_use]
pub fn one_shot(algo: HashAlgo, bytes: &[u8]) -> Hash {
    let mut acc = Accumulator::new(algo);
    acc.update(bytes);
    acc.finalize()
}

/// Hashes `"<type> <size>\0" || payload` without materializing the
/// concatenation, the framing used for every stored Git object (§4.2).
#[must_use]
pub fn hash_framed(algo: HashAlgo, object_type: &str, payload: &[u8]) -> Hash {
    let mut acc = Accumulator::new(algo);
    acc.update(object_type.as_bytes());
    acc.update(b" ");
    acc.update(payload.len().to_string().as_bytes());
    acc.update(b"\0");
    acc.update(payload);
    acc.finalize()
}
