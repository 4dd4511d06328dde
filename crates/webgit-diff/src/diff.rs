//! Hunk assembly, unified-diff formatting, and `apply` (C8).

use serde::Serialize;

use crate::binary::looks_binary;
use crate::lines::{join_lines, split_lines};
use crate::myers::{self, Op};

/// What kind of line a [`Change`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    /// A line present, unchanged, in both sides.
    Context,
    /// A line present only in the new side.
    Add,
    /// A line present only in the old side.
    Delete,
}

/// One line within a [`Hunk`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// What kind of change this line represents.
    pub kind: ChangeKind,
    /// The line's content, without a line terminator.
    pub content: String,
    /// The line's 1-based line number in the old text, if it has one.
    pub old_line: Option<usize>,
    /// The line's 1-based line number in the new text, if it has one.
    pub new_line: Option<usize>,
}

/// A contiguous span of changes with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    /// 1-based starting line in the old text.
    pub old_start: usize,
    /// Number of old-text lines (context + deletions) this hunk covers.
    pub old_lines: usize,
    /// 1-based starting line in the new text.
    pub new_start: usize,
    /// Number of new-text lines (context + additions) this hunk covers.
    pub new_lines: usize,
    /// The hunk's lines, in order.
    pub changes: Vec<Change>,
}

/// The result of diffing two texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// The hunks, in old-text order.
    pub hunks: Vec<Hunk>,
    /// Total added lines across all hunks.
    pub additions: usize,
    /// Total deleted lines across all hunks.
    pub deletions: usize,
    /// Always `false`: text diffs never set this; see [`diff_files`] for
    /// the binary path.
    pub is_binary: bool,
    pub(crate) old_trailing_newline: bool,
    pub(crate) new_trailing_newline: bool,
}

/// Options controlling [`diff`].
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Lines of context kept around each change run.
    pub context_lines: usize,
    /// Normalize away leading/trailing whitespace and run-length before
    /// comparing lines (original content is still reported).
    pub ignore_whitespace: bool,
    /// Normalize case before comparing lines.
    pub ignore_case: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            ignore_whitespace: false,
            ignore_case: false,
        }
    }
}

/// A binary-file comparison result, reported instead of a [`Diff`] when
/// either side looks binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BinaryDiff {
    /// Size of the old content, in bytes.
    pub old_size: usize,
    /// Size of the new content, in bytes.
    pub new_size: usize,
    /// True if the sizes differ.
    pub size_changed: bool,
}

/// The outcome of [`diff_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FileDiff {
    /// Both sides were text; a full line diff was computed.
    Text(Diff),
    /// At least one side looked binary; no line diff was attempted.
    Binary(BinaryDiff),
}

/// Output style for [`format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    /// `--- a/path` / `+++ b/path` / `@@ ... @@` unified format.
    Unified,
    /// Two-column old/new rendering.
    SideBySide,
    /// JSON rendering of the [`Diff`] structure.
    Json,
}

fn normalize(line: &str, opts: &DiffOptions) -> String {
    let mut s = line.to_string();
    if opts.ignore_whitespace {
        s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    if opts.ignore_case {
        s = s.to_lowercase();
    }
    s
}

/// Diffs `old_text` against `new_text` at line granularity.
#[must_use]
pub fn diff(old_text: &str, new_text: &str, opts: DiffOptions) -> Diff {
    let old = split_lines(old_text);
    let new = split_lines(new_text);
    let ops = myers::diff(&old.lines, &new.lines, |a, b| normalize(a, &opts) == normalize(b, &opts));

    let mut changes = Vec::with_capacity(ops.len());
    let mut old_line = 1usize;
    let mut new_line = 1usize;
    for op in &ops {
        match *op {
            Op::Equal(oi, ni) => {
                changes.push(Change {
                    kind: ChangeKind::Context,
                    content: old.lines[oi].clone(),
                    old_line: Some(old_line),
                    new_line: Some(new_line),
                });
                old_line += 1;
                new_line += 1;
            }
            Op::Delete(oi) => {
                changes.push(Change {
                    kind: ChangeKind::Delete,
                    content: old.lines[oi].clone(),
                    old_line: Some(old_line),
                    new_line: Some(new_line),
                });
                old_line += 1;
            }
            Op::Insert(ni) => {
                changes.push(Change {
                    kind: ChangeKind::Add,
                    content: new.lines[ni].clone(),
                    old_line: Some(old_line),
                    new_line: Some(new_line),
                });
                new_line += 1;
            }
        }
    }

    let hunks = assemble_hunks(&changes, opts.context_lines);
    let additions = changes.iter().filter(|c| c.kind == ChangeKind::Add).count();
    let deletions = changes.iter().filter(|c| c.kind == ChangeKind::Delete).count();

    Diff {
        hunks,
        additions,
        deletions,
        is_binary: false,
        old_trailing_newline: old.trailing_newline,
        new_trailing_newline: new.trailing_newline,
    }
}

fn assemble_hunks(changes: &[Change], context_lines: usize) -> Vec<Hunk> {
    if changes.is_empty() {
        return Vec::new();
    }
    let changed_indices: Vec<usize> = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind != ChangeKind::Context)
        .map(|(i, _)| i)
        .collect();
    if changed_indices.is_empty() {
        return Vec::new();
    }

    // Group changed indices into clusters, merging when the context gap
    // between them is small enough that their windows would overlap.
    let mut clusters: Vec<(usize, usize)> = Vec::new();
    let mut start = changed_indices[0];
    let mut end = changed_indices[0];
    for &idx in &changed_indices[1..] {
        if idx - end <= 2 * context_lines + 1 {
            end = idx;
        } else {
            clusters.push((start, end));
            start = idx;
            end = idx;
        }
    }
    clusters.push((start, end));

    clusters
        .into_iter()
        .map(|(start, end)| {
            let window_start = start.saturating_sub(context_lines);
            let window_end = (end + 1 + context_lines).min(changes.len());
            let slice = &changes[window_start..window_end];

            let old_start = slice
                .iter()
                .find_map(|c| c.old_line)
                .unwrap_or(1);
            let new_start = slice
                .iter()
                .find_map(|c| c.new_line)
                .unwrap_or(1);
            let old_lines = slice.iter().filter(|c| c.kind != ChangeKind::Add).count();
            let new_lines = slice.iter().filter(|c| c.kind != ChangeKind::Delete).count();

            Hunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                changes: slice.to_vec(),
            }
        })
        .collect()
}

/// Compares two byte buffers, short-circuiting to [`FileDiff::Binary`]
/// if either looks binary per the shared NUL-byte heuristic.
#[must_use]
pub fn diff_files(old_bytes: &[u8], new_bytes: &[u8], opts: DiffOptions) -> FileDiff {
    if looks_binary(old_bytes) || looks_binary(new_bytes) {
        return FileDiff::Binary(BinaryDiff {
            old_size: old_bytes.len(),
            new_size: new_bytes.len(),
            size_changed: old_bytes.len() != new_bytes.len(),
        });
    }
    let old_text = String::from_utf8_lossy(old_bytes);
    let new_text = String::from_utf8_lossy(new_bytes);
    FileDiff::Text(diff(&old_text, &new_text, opts))
}

/// Renders `diff` in the requested style. `old_path`/`new_path` are used
/// only by [`FormatStyle::Unified`]'s `--- a/...` / `+++ b/...` header.
#[must_use]
pub fn format(diff: &Diff, style: FormatStyle, old_path: &str, new_path: &str) -> String {
    match style {
        FormatStyle::Unified => format_unified(diff, old_path, new_path),
        FormatStyle::SideBySide => format_side_by_side(diff),
        FormatStyle::Json => serde_json::to_string_pretty(diff).unwrap_or_default(),
    }
}

fn format_unified(diff: &Diff, old_path: &str, new_path: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- a/{old_path}\n"));
    out.push_str(&format!("+++ b/{new_path}\n"));
    for hunk in &diff.hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        ));
        for change in &hunk.changes {
            let prefix = match change.kind {
                ChangeKind::Context => ' ',
                ChangeKind::Add => '+',
                ChangeKind::Delete => '-',
            };
            out.push(prefix);
            out.push_str(&change.content);
            out.push('\n');
        }
    }
    out
}

fn format_side_by_side(diff: &Diff) -> String {
    let mut out = String::new();
    for hunk in &diff.hunks {
        for change in &hunk.changes {
            match change.kind {
                ChangeKind::Context => out.push_str(&format!("{0:<40} | {0}\n", change.content)),
                ChangeKind::Delete => out.push_str(&format!("{:<40} |\n", change.content)),
                ChangeKind::Add => out.push_str(&format!("{:<40} | {}\n", "", change.content)),
            }
        }
    }
    out
}

/// Applies `diff` to `old_text`, reconstructing the new text. Returns
/// `None` if a context or deleted line does not match `old_text`
/// (the diff does not apply cleanly).
#[must_use]
pub fn apply(old_text: &str, diff: &Diff) -> Option<String> {
    if diff.is_binary {
        return None;
    }
    let old = split_lines(old_text);
    let mut out: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    for hunk in &diff.hunks {
        let hunk_old_start = hunk.old_start.saturating_sub(1);
        if hunk_old_start < cursor || hunk_old_start > old.lines.len() {
            return None;
        }
        out.extend_from_slice(&old.lines[cursor..hunk_old_start]);
        cursor = hunk_old_start;

        for change in &hunk.changes {
            match change.kind {
                ChangeKind::Context | ChangeKind::Delete => {
                    if old.lines.get(cursor) != Some(&change.content) {
                        return None;
                    }
                    if change.kind == ChangeKind::Context {
                        out.push(change.content.clone());
                    }
                    cursor += 1;
                }
                ChangeKind::Add => out.push(change.content.clone()),
            }
        }
    }
    out.extend_from_slice(&old.lines[cursor..]);
    Some(join_lines(&out, diff.new_trailing_newline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hi_to_hello_is_one_hunk_with_one_change() {
        let d = diff("hi\n", "hello\n", DiffOptions::default());
        assert_eq!(d.hunks.len(), 1);
        assert_eq!(d.additions, 1);
        assert_eq!(d.deletions, 1);
        assert_eq!(apply("hi\n", &d).as_deref(), Some("hello\n"));
    }

    #[test]
    fn identical_text_produces_no_hunks() {
        let d = diff("a\nb\n", "a\nb\n", DiffOptions::default());
        assert!(d.hunks.is_empty());
        assert_eq!(apply("a\nb\n", &d).as_deref(), Some("a\nb\n"));
    }

    #[test]
    fn unified_format_matches_expected_shape() {
        let d = diff("a\nb\nc\n", "a\nx\nc\n", DiffOptions::default());
        let text = format(&d, FormatStyle::Unified, "f", "f");
        assert!(text.starts_with("--- a/f\n+++ b/f\n"));
        assert!(text.contains("@@ -1,3 +1,3 @@\n"));
        assert!(text.contains("-b\n"));
        assert!(text.contains("+x\n"));
    }

    #[test]
    fn apply_fails_on_mismatched_context() {
        let d = diff("a\nb\nc\n", "a\nx\nc\n", DiffOptions::default());
        assert!(apply("a\nDIFFERENT\nc\n", &d).is_none());
    }

    #[test]
    fn adjacent_hunks_merge_when_context_overlaps() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n";
        let new = "1\n2\nX\n4\n5\n6\n7\nY\n9\n10\n";
        let d = diff(old, new, DiffOptions { context_lines: 3, ..Default::default() });
        assert_eq!(d.hunks.len(), 1, "changes 2 apart with context 3 should merge into one hunk");
    }

    #[test]
    fn far_apart_changes_stay_separate_hunks() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n13\n14\n15\n";
        let new = "X\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n13\n14\nY\n";
        let d = diff(old, new, DiffOptions { context_lines: 2, ..Default::default() });
        assert_eq!(d.hunks.len(), 2);
    }

    #[test]
    fn ignore_whitespace_treats_reformatted_lines_as_equal() {
        let d = diff("a  b\n", "a b\n", DiffOptions { ignore_whitespace: true, ..Default::default() });
        assert!(d.hunks.is_empty());
    }

    #[test]
    fn preserves_missing_trailing_newline() {
        let d = diff("a\nb", "a\nc", DiffOptions::default());
        assert_eq!(apply("a\nb", &d).as_deref(), Some("a\nc"));
    }

    proptest::proptest! {
        #[test]
        fn apply_round_trips(
            old in proptest::collection::vec("[a-c]", 0..10),
            new in proptest::collection::vec("[a-c]", 0..10),
        ) {
            let old_text = join_lines(&old, true);
            let new_text = join_lines(&new, true);
            let d = diff(&old_text, &new_text, DiffOptions::default());
            proptest::prop_assert_eq!(apply(&old_text, &d), Some(new_text));
        }
    }
}
