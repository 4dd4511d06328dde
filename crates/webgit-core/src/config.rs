//! Repository configuration: the four recognized keys, serialized as
//! `key = value` lines under the blob store's `config` key.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::hash::HashAlgo;

/// Typed view over a repository's configuration. Unknown keys round-trip
/// untouched rather than being rejected, matching Git's own forward
/// compatible config behavior.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Hash algorithm, fixed at init.
    pub hash_algorithm: HashAlgo,
    /// Whether the repository omits a working tree.
    pub bare: bool,
    /// Default author/committer name.
    pub user_name: Option<String>,
    /// Default author/committer email.
    pub user_email: Option<String>,
    /// Name of the branch created by `init`.
    pub default_branch: String,
    /// Any other `key = value` pairs present in the config blob, preserved
    /// verbatim across load/save.
    pub extra: BTreeMap<String, String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgo::Sha1,
            bare: false,
            user_name: None,
            user_email: None,
            default_branch: "main".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl RepoConfig {
    /// Parses the text contents of the `config` blob-store key.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cfg = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::malformed(format!("bad config line: {line}")));
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "core.hashAlgorithm" => cfg.hash_algorithm = HashAlgo::parse(value)?,
                "core.bare" => cfg.bare = value == "true",
                "user.name" => cfg.user_name = Some(value.to_string()),
                "user.email" => cfg.user_email = Some(value.to_string()),
                "init.defaultBranch" => cfg.default_branch = value.to_string(),
                other => {
                    cfg.extra.insert(other.to_string(), value.to_string());
                }
            }
        }
        Ok(cfg)
    }

    /// Serializes this configuration back to `key = value` text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "core.hashAlgorithm = {}",
            self.hash_algorithm.as_config_str()
        );
        let _ = writeln!(out, "core.bare = {}", self.bare);
        if let Some(name) = &self.user_name {
            let _ = writeln!(out, "user.name = {name}");
        }
        if let Some(email) = &self.user_email {
            let _ = writeln!(out, "user.email = {email}");
        }
        let _ = writeln!(out, "init.defaultBranch = {}", self.default_branch);
        for (k, v) in &self.extra {
            let _ = writeln!(out, "{k} = {v}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_default() {
        let cfg = RepoConfig::default();
        let text = cfg.to_text();
        let parsed = RepoConfig::parse(&text).unwrap();
        assert_eq!(parsed.hash_algorithm, HashAlgo::Sha1);
        assert_eq!(parsed.default_branch, "main");
        assert!(!parsed.bare);
    }

    #[test]
    fn preserves_unknown_keys() {
        let text = "core.hashAlgorithm = sha256\nremote.origin.url = https://example.com/r\n";
        let cfg = RepoConfig::parse(text).unwrap();
        assert_eq!(cfg.hash_algorithm, HashAlgo::Sha256);
        assert_eq!(
            cfg.extra.get("remote.origin.url").map(String::as_str),
            Some("https://example.com/r")
        );
        assert!(cfg.to_text().contains("remote.origin.url = https://example.com/r"));
    }

    #[test]
    fn rejects_malformed_line() {
        let err = RepoConfig::parse("not a valid line").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
