//! Three-way content merge (§4.7.3): a diff3 alignment built from two
//! Myers diffs against the common base, with conflict-marker synthesis
//! where ours and theirs diverge incompatibly.

use webgit_diff::myers::{diff as myers_diff, Op};
use webgit_diff::{join_lines, looks_binary, split_lines};

/// Git's conventional conflict markers.
pub const MARKER_OURS: &str = "<<<<<<< HEAD";
pub const MARKER_SEP: &str = "=======";
pub const MARKER_THEIRS: &str = ">>>>>>> MERGE";

/// The result of merging three byte buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentMergeOutcome {
    /// At least one side looked binary; no text merge was attempted.
    Binary,
    /// A text merge was produced, possibly containing conflict markers.
    Text {
        /// The merged text.
        text: String,
        /// True if any conflict region was emitted.
        has_conflict: bool,
    },
}

/// Merges `base`/`ours`/`theirs` byte content. Short-circuits to
/// [`ContentMergeOutcome::Binary`] if any side contains a NUL byte in
/// its first 8000 bytes, matching the diff engine's heuristic.
#[must_use]
pub fn merge_content(base: &[u8], ours: &[u8], theirs: &[u8]) -> ContentMergeOutcome {
    if looks_binary(base) || looks_binary(ours) || looks_binary(theirs) {
        return ContentMergeOutcome::Binary;
    }
    let base_text = String::from_utf8_lossy(base);
    let ours_text = String::from_utf8_lossy(ours);
    let theirs_text = String::from_utf8_lossy(theirs);

    let base_lines = split_lines(&base_text);
    let ours_lines = split_lines(&ours_text);
    let theirs_lines = split_lines(&theirs_text);

    let (lines, has_conflict) = merge_lines(&base_lines.lines, &ours_lines.lines, &theirs_lines.lines);
    let trailing_newline = ours_lines.trailing_newline || theirs_lines.trailing_newline;
    ContentMergeOutcome::Text {
        text: join_lines(&lines, trailing_newline),
        has_conflict,
    }
}

/// A maximal run of base lines confirmed identical across all three
/// sides (a diff3 "anchor"/sync point).
#[derive(Debug, Clone, Copy)]
struct Anchor {
    base_start: usize,
    base_len: usize,
    ours_start: usize,
    theirs_start: usize,
}

/// A contiguous matched run extracted from a two-way Myers diff: base
/// lines `[base_start, base_start+len)` equal other lines
/// `[other_start, other_start+len)`.
#[derive(Debug, Clone, Copy)]
struct MatchBlock {
    base_start: usize,
    other_start: usize,
    len: usize,
}

fn matching_blocks(ops: &[Op]) -> Vec<MatchBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<MatchBlock> = None;
    for op in ops {
        match *op {
            Op::Equal(bi, oi) => match &mut current {
                Some(block) if block.base_start + block.len == bi && block.other_start + block.len == oi => {
                    block.len += 1;
                }
                _ => {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                    current = Some(MatchBlock {
                        base_start: bi,
                        other_start: oi,
                        len: 1,
                    });
                }
            },
            _ => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

/// Intersects two lists of base-anchored matching blocks (sorted,
/// non-overlapping) into the ranges where *both* sides kept the base
/// line unchanged — the diff3 sync points.
fn intersect_anchors(blocks_o: &[MatchBlock], blocks_t: &[MatchBlock]) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < blocks_o.len() && j < blocks_t.len() {
        let o = blocks_o[i];
        let t = blocks_t[j];
        let o_end = o.base_start + o.len;
        let t_end = t.base_start + t.len;
        let start = o.base_start.max(t.base_start);
        let end = o_end.min(t_end);
        if start < end {
            anchors.push(Anchor {
                base_start: start,
                base_len: end - start,
                ours_start: o.other_start + (start - o.base_start),
                theirs_start: t.other_start + (start - t.base_start),
            });
        }
        if o_end < t_end {
            i += 1;
        } else {
            j += 1;
        }
    }
    anchors
}

/// Aligns `(base, ours, theirs)` via two Myers diffs against `base` and
/// emits either unchanged text or a conflict-marked region per gap
/// between sync anchors (§4.7.3, §9 diff3 resolution).
fn merge_lines(base: &[String], ours: &[String], theirs: &[String]) -> (Vec<String>, bool) {
    let ops_o = myers_diff(base, ours, |a, b| a == b);
    let ops_t = myers_diff(base, theirs, |a, b| a == b);
    let blocks_o = matching_blocks(&ops_o);
    let blocks_t = matching_blocks(&ops_t);
    let anchors = intersect_anchors(&blocks_o, &blocks_t);

    let start_anchor = Anchor {
        base_start: 0,
        base_len: 0,
        ours_start: 0,
        theirs_start: 0,
    };
    let end_anchor = Anchor {
        base_start: base.len(),
        base_len: 0,
        ours_start: ours.len(),
        theirs_start: theirs.len(),
    };
    let mut all = Vec::with_capacity(anchors.len() + 2);
    all.push(start_anchor);
    all.extend(anchors);
    all.push(end_anchor);

    let mut out = Vec::new();
    let mut has_conflict = false;

    for window in all.windows(2) {
        let (a, b) = (window[0], window[1]);
        let a_base_end = a.base_start + a.base_len;
        let a_ours_end = a.ours_start + a.base_len;
        let a_theirs_end = a.theirs_start + a.base_len;

        let gap_base = &base[a_base_end..b.base_start];
        let gap_ours = &ours[a_ours_end..b.ours_start];
        let gap_theirs = &theirs[a_theirs_end..b.theirs_start];

        if gap_ours == gap_base && gap_theirs == gap_base {
            out.extend_from_slice(gap_base);
        } else if gap_ours == gap_base {
            out.extend_from_slice(gap_theirs);
        } else if gap_theirs == gap_base {
            out.extend_from_slice(gap_ours);
        } else if gap_ours == gap_theirs {
            out.extend_from_slice(gap_ours);
        } else {
            has_conflict = true;
            out.push(MARKER_OURS.to_string());
            out.extend_from_slice(gap_ours);
            out.push(MARKER_SEP.to_string());
            out.extend_from_slice(gap_theirs);
            out.push(MARKER_THEIRS.to_string());
        }

        // Emit the anchor run itself (identical across all three), except
        // for the terminal sentinel which covers no real lines.
        if b.base_len > 0 {
            out.extend_from_slice(&base[b.base_start..b.base_start + b.base_len]);
        }
    }

    (out, has_conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_overlapping_changes_merge_cleanly() {
        let base = b"a\nb\nc\n";
        let ours = b"A\nb\nc\n";
        let theirs = b"a\nb\nC\n";
        let outcome = merge_content(base, ours, theirs);
        let ContentMergeOutcome::Text { text, has_conflict } = outcome else { panic!("expected text") };
        assert!(!has_conflict);
        assert_eq!(text, "A\nb\nC\n");
    }

    #[test]
    fn overlapping_line_change_conflicts() {
        let base = b"a\nb\nc\n";
        let ours = b"a\nB\nc\n";
        let theirs = b"a\nB'\nc\n";
        let outcome = merge_content(base, ours, theirs);
        let ContentMergeOutcome::Text { text, has_conflict } = outcome else { panic!("expected text") };
        assert!(has_conflict);
        assert_eq!(
            text,
            "a\n<<<<<<< HEAD\nB\n=======\nB'\n>>>>>>> MERGE\nc\n"
        );
    }

    #[test]
    fn both_sides_adding_the_same_line_is_not_a_conflict() {
        let base = b"a\nc\n";
        let ours = b"a\nb\nc\n";
        let theirs = b"a\nb\nc\n";
        let outcome = merge_content(base, ours, theirs);
        let ContentMergeOutcome::Text { text, has_conflict } = outcome else { panic!("expected text") };
        assert!(!has_conflict);
        assert_eq!(text, "a\nb\nc\n");
    }

    #[test]
    fn insertion_on_one_side_does_not_desync_the_other_side_edit() {
        // Ours inserts a line near the top; theirs independently edits a
        // line further down. A naive index-by-index merge would
        // misalign these and spuriously conflict.
        let base = "1\n2\n3\n4\n5\n".to_string();
        let ours = "1\nX\n2\n3\n4\n5\n".to_string();
        let theirs = "1\n2\n3\n4\nY\n".to_string();
        let outcome = merge_content(base.as_bytes(), ours.as_bytes(), theirs.as_bytes());
        let ContentMergeOutcome::Text { text, has_conflict } = outcome else { panic!("expected text") };
        assert!(!has_conflict, "got: {text}");
        assert_eq!(text, "1\nX\n2\n3\n4\nY\n");
    }

    #[test]
    fn binary_content_short_circuits() {
        let outcome = merge_content(&[0, 1, 2], &[0, 1, 2], &[0, 1, 3]);
        assert_eq!(outcome, ContentMergeOutcome::Binary);
    }

    #[test]
    fn merging_identical_sides_is_a_no_op() {
        let text = b"a\nb\nc\n";
        let outcome = merge_content(text, text, text);
        let ContentMergeOutcome::Text { text: merged, has_conflict } = outcome else { panic!("expected text") };
        assert!(!has_conflict);
        assert_eq!(merged, "a\nb\nc\n");
    }
}
