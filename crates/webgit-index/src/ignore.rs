//! Ignore rules: a set of glob predicates, supplied externally, that
//! `add` honors unless `force` is set.

use glob::Pattern;

/// A compiled set of ignore-glob predicates.
#[derive(Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compiles a list of glob patterns (e.g. `target/**`, `*.tmp`). An
    /// unparsable pattern is skipped rather than rejected, since ignore
    /// lists are advisory, not a correctness boundary.
    #[must_use]
    pub fn new(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let compiled = patterns
            .into_iter()
            .filter_map(|p| Pattern::new(p.as_ref()).ok())
            .collect();
        Self { patterns: compiled }
    }

    /// An ignore set that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    /// True if `path` matches any pattern in this set.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}
