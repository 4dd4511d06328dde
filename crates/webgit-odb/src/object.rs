//! The Git object model: blobs, trees, commits, and annotated tags, with
//! canonical encoders and validating decoders (C2).

use bytes::Bytes;
use webgit_core::hash::HashAlgo;
use webgit_core::{Error, Hash, Result};

/// The four object variants a repository can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory snapshot.
    Tree,
    /// Immutable history node.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// The literal type word used in object framing (`"<type> <size>\0"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses the type word from an object header.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(Error::malformed(format!("unknown object type '{other}'"))),
        }
    }
}

/// A tree entry's file mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// A subdirectory (tree).
    Dir,
    /// A regular, non-executable file.
    Regular,
    /// An executable file.
    Executable,
    /// A symbolic link, whose blob content is the link target.
    Symlink,
    /// A commit reference to another repository (submodule-like).
    Gitlink,
}

impl FileMode {
    /// The octal mode value, as Git writes it.
    #[must_use]
    pub const fn as_octal(self) -> u32 {
        match self {
            Self::Dir => 0o40000,
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
        }
    }

    /// True if this mode denotes a directory (recurse into another tree).
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Dir)
    }

    /// Parses an ASCII-octal mode string from a tree entry.
    pub fn parse(s: &str) -> Result<Self> {
        let value = u32::from_str_radix(s, 8)
            .map_err(|_| Error::malformed(format!("bad mode '{s}'")))?;
        match value {
            0o40000 => Ok(Self::Dir),
            0o100644 => Ok(Self::Regular),
            0o100755 => Ok(Self::Executable),
            0o120000 => Ok(Self::Symlink),
            0o160000 => Ok(Self::Gitlink),
            other => Err(Error::malformed(format!("unrecognized mode {other:o}"))),
        }
    }
}

/// One entry in a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// The entry's file mode.
    pub mode: FileMode,
    /// The entry's name, within its parent tree. Never contains `/` or a
    /// NUL byte.
    pub name: String,
    /// The hash of the blob (file) or tree (directory) this entry points
    /// to.
    pub hash: Hash,
}

impl TreeEntry {
    /// The sort key used to order entries: the name, with an implicit
    /// trailing `/` for directories, so `"foo"` (a file) sorts before
    /// `"foo/"` (the directory `foo`) even though `"foo" < "foo/"` would
    /// otherwise tie on the shared prefix.
    fn sort_key(&self) -> String {
        if self.mode.is_dir() {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A directory snapshot: an ordered set of `(mode, name, hash)` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    /// Entries, always kept sorted by [`TreeEntry::sort_key`].
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Builds a tree from entries in any order, sorting them per the
    /// directory-suffix rule. Re-sorting an already-sorted tree is a
    /// no-op.
    #[must_use]
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { entries }
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Author/committer/tagger identity and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Unix timestamp, in seconds.
    pub seconds: i64,
    /// UTC offset, in seconds (e.g. `+0000` is `0`, `-0500` is `-18000`).
    pub tz_offset_seconds: i32,
}

impl Signature {
    /// Renders the `Name <email> <unix_seconds> <+-HHMM>` text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let sign = if self.tz_offset_seconds < 0 { '-' } else { '+' };
        let abs = self.tz_offset_seconds.unsigned_abs();
        let hh = abs / 3600;
        let mm = (abs % 3600) / 60;
        format!(
            "{} <{}> {} {}{:02}{:02}",
            self.name, self.email, self.seconds, sign, hh, mm
        )
    }

    /// Parses the `Name <email> <unix_seconds> <+-HHMM>` text form.
    pub fn parse(line: &str) -> Result<Self> {
        let lt = line.rfind('<').ok_or_else(|| Error::malformed("bad signature: missing '<'"))?;
        let gt = line.rfind('>').ok_or_else(|| Error::malformed("bad signature: missing '>'"))?;
        if gt < lt {
            return Err(Error::malformed("bad signature: '>' before '<'"));
        }
        let name = line[..lt].trim().to_string();
        let email = line[lt + 1..gt].to_string();
        let rest = line[gt + 1..].trim();
        let mut parts = rest.split_whitespace();
        let seconds: i64 = parts
            .next()
            .ok_or_else(|| Error::malformed("bad signature: missing timestamp"))?
            .parse()
            .map_err(|_| Error::malformed("bad signature: non-numeric timestamp"))?;
        let tz = parts
            .next()
            .ok_or_else(|| Error::malformed("bad signature: missing timezone"))?;
        let tz_offset_seconds = parse_tz_offset(tz)?;
        Ok(Self {
            name,
            email,
            seconds,
            tz_offset_seconds,
        })
    }
}

fn parse_tz_offset(tz: &str) -> Result<i32> {
    if tz.len() != 5 || (tz.as_bytes()[0] != b'+' && tz.as_bytes()[0] != b'-') {
        return Err(Error::malformed(format!("bad timezone '{tz}'")));
    }
    let sign = if tz.as_bytes()[0] == b'-' { -1 } else { 1 };
    let hh: i32 = tz[1..3]
        .parse()
        .map_err(|_| Error::malformed(format!("bad timezone '{tz}'")))?;
    let mm: i32 = tz[3..5]
        .parse()
        .map_err(|_| Error::malformed(format!("bad timezone '{tz}'")))?;
    Ok(sign * (hh * 3600 + mm * 60))
}

/// An immutable history node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The tree this commit snapshots.
    pub tree: Hash,
    /// Parent commits; empty for a root commit, multiple for a merge.
    pub parents: Vec<Hash>,
    /// Who authored the change.
    pub author: Signature,
    /// Who committed it (may differ from the author).
    pub committer: Signature,
    /// The commit message, including any trailing newline the caller
    /// supplied.
    pub message: String,
}

/// An annotated tag pointing at another object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// The object this tag names.
    pub target: Hash,
    /// The type of the target object.
    pub target_type: ObjectKind,
    /// The tag's own name.
    pub name: String,
    /// Who created the tag.
    pub tagger: Signature,
    /// The tag message.
    pub message: String,
}

/// A decoded Git object, with its framed identity hash once known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// Raw file content.
    Blob(Bytes),
    /// Directory snapshot.
    Tree(Tree),
    /// History node.
    Commit(Commit),
    /// Annotated tag.
    Tag(Tag),
}

impl Object {
    /// The object's kind.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Canonically encodes this object's payload (everything after the
    /// `"<type> <size>\0"` framing prefix).
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(data) => data.to_vec(),
            Self::Tree(tree) => encode_tree(tree),
            Self::Commit(commit) => encode_commit(commit).into_bytes(),
            Self::Tag(tag) => encode_tag(tag).into_bytes(),
        }
    }

    /// Computes this object's framed identity hash under `algo`, without
    /// materializing `"<type> <size>\0" || payload` as one buffer.
    #[must_use]
    pub fn hash(&self, algo: HashAlgo) -> Hash {
        webgit_core::hash::hash_framed(algo, self.kind().as_str(), &self.encode_payload())
    }

    /// Decodes a payload of the given kind. `hash_width` comes from the
    /// repository's configured hash algorithm; tree decoding never
    /// infers it from the bytes (§9).
    pub fn decode(kind: ObjectKind, payload: &[u8], hash_algo: HashAlgo) -> Result<Self> {
        match kind {
            ObjectKind::Blob => Ok(Self::Blob(Bytes::copy_from_slice(payload))),
            ObjectKind::Tree => Ok(Self::Tree(decode_tree(payload, hash_algo)?)),
            ObjectKind::Commit => Ok(Self::Commit(decode_commit(payload, hash_algo)?)),
            ObjectKind::Tag => Ok(Self::Tag(decode_tag(payload, hash_algo)?)),
        }
    }
}

fn encode_tree(tree: &Tree) -> Vec<u8> {
    let sorted = Tree::new(tree.entries.clone());
    let mut out = Vec::new();
    for entry in &sorted.entries {
        out.extend_from_slice(format!("{:o}", entry.mode.as_octal()).as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name.as_bytes());
        out.push(0);
        out.extend_from_slice(entry.hash.as_bytes());
    }
    out
}

fn decode_tree(payload: &[u8], hash_algo: HashAlgo) -> Result<Tree> {
    let width = hash_algo.width();
    let mut entries = Vec::new();
    let mut i = 0;
    while i < payload.len() {
        let space = payload[i..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| Error::malformed("tree entry missing mode separator"))?
            + i;
        let mode_str = std::str::from_utf8(&payload[i..space])
            .map_err(|_| Error::malformed("tree entry mode is not utf8"))?;
        let mode = FileMode::parse(mode_str)?;
        let nul = payload[space + 1..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed("tree entry missing name terminator"))?
            + space
            + 1;
        let name = std::str::from_utf8(&payload[space + 1..nul])
            .map_err(|_| Error::malformed("tree entry name is not utf8"))?
            .to_string();
        if name.contains('/') || name.contains('\0') {
            return Err(Error::malformed("tree entry name contains '/' or NUL"));
        }
        let hash_start = nul + 1;
        let hash_end = hash_start + width;
        if hash_end > payload.len() {
            return Err(Error::malformed("tree entry hash truncated"));
        }
        let hash = Hash::from_bytes(hash_algo, &payload[hash_start..hash_end])?;
        entries.push(TreeEntry { mode, name, hash });
        i = hash_end;
    }
    Ok(Tree::new(entries))
}

fn encode_commit(commit: &Commit) -> String {
    let mut out = String::new();
    out.push_str(&format!("tree {}\n", commit.tree.to_hex()));
    for parent in &commit.parents {
        out.push_str(&format!("parent {}\n", parent.to_hex()));
    }
    out.push_str(&format!("author {}\n", commit.author.to_text()));
    out.push_str(&format!("committer {}\n", commit.committer.to_text()));
    out.push('\n');
    out.push_str(&commit.message);
    out
}

fn decode_commit(payload: &[u8], hash_algo: HashAlgo) -> Result<Commit> {
    let text = std::str::from_utf8(payload).map_err(|_| Error::malformed("commit is not utf8"))?;
    let (header, message) = text
        .split_once("\n\n")
        .ok_or_else(|| Error::malformed("commit missing header/message separator"))?;
    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;
    for line in header.lines() {
        if let Some(rest) = line.strip_prefix("tree ") {
            tree = Some(Hash::from_hex(hash_algo, rest)?);
        } else if let Some(rest) = line.strip_prefix("parent ") {
            parents.push(Hash::from_hex(hash_algo, rest)?);
        } else if let Some(rest) = line.strip_prefix("author ") {
            author = Some(Signature::parse(rest)?);
        } else if let Some(rest) = line.strip_prefix("committer ") {
            committer = Some(Signature::parse(rest)?);
        } else {
            return Err(Error::malformed(format!("unexpected commit header line '{line}'")));
        }
    }
    Ok(Commit {
        tree: tree.ok_or_else(|| Error::malformed("commit missing tree"))?,
        parents,
        author: author.ok_or_else(|| Error::malformed("commit missing author"))?,
        committer: committer.ok_or_else(|| Error::malformed("commit missing committer"))?,
        message: message.to_string(),
    })
}

fn encode_tag(tag: &Tag) -> String {
    let mut out = String::new();
    out.push_str(&format!("object {}\n", tag.target.to_hex()));
    out.push_str(&format!("type {}\n", tag.target_type.as_str()));
    out.push_str(&format!("tag {}\n", tag.name));
    out.push_str(&format!("tagger {}\n", tag.tagger.to_text()));
    out.push('\n');
    out.push_str(&tag.message);
    out
}

fn decode_tag(payload: &[u8], hash_algo: HashAlgo) -> Result<Tag> {
    let text = std::str::from_utf8(payload).map_err(|_| Error::malformed("tag is not utf8"))?;
    let (header, message) = text
        .split_once("\n\n")
        .ok_or_else(|| Error::malformed("tag missing header/message separator"))?;
    let mut target = None;
    let mut target_type = None;
    let mut name = None;
    let mut tagger = None;
    for line in header.lines() {
        if let Some(rest) = line.strip_prefix("object ") {
            target = Some(Hash::from_hex(hash_algo, rest)?);
        } else if let Some(rest) = line.strip_prefix("type ") {
            target_type = Some(ObjectKind::parse(rest)?);
        } else if let Some(rest) = line.strip_prefix("tag ") {
            name = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("tagger ") {
            tagger = Some(Signature::parse(rest)?);
        } else {
            return Err(Error::malformed(format!("unexpected tag header line '{line}'")));
        }
    }
    Ok(Tag {
        target: target.ok_or_else(|| Error::malformed("tag missing object"))?,
        target_type: target_type.ok_or_else(|| Error::malformed("tag missing type"))?,
        name: name.ok_or_else(|| Error::malformed("tag missing name"))?,
        tagger: tagger.ok_or_else(|| Error::malformed("tag missing tagger"))?,
        message: message.to_string(),
    })
}
