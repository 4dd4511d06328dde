//! Line splitting shared across the diff and merge engines: accepts
//! both `\n` and `\r\n`, reports whether the input ended with a trailing
//! newline so round-tripping can preserve it.

/// The result of splitting text into lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines {
    /// Line contents, with line terminators stripped.
    pub lines: Vec<String>,
    /// True if the original text ended with a newline.
    pub trailing_newline: bool,
}

/// Splits `text` into lines, accepting both `\n` and `\r\n` as
/// terminators; the content itself never includes the terminator.
#[must_use]
pub fn split_lines(text: &str) -> Lines {
    if text.is_empty() {
        return Lines {
            lines: Vec::new(),
            trailing_newline: false,
        };
    }
    let mut lines = Vec::new();
    let mut rest = text;
    loop {
        match rest.find('\n') {
            Some(pos) => {
                let mut line = &rest[..pos];
                if let Some(stripped) = line.strip_suffix('\r') {
                    line = stripped;
                }
                lines.push(line.to_string());
                rest = &rest[pos + 1..];
                if rest.is_empty() {
                    return Lines {
                        lines,
                        trailing_newline: true,
                    };
                }
            }
            None => {
                lines.push(rest.to_string());
                return Lines {
                    lines,
                    trailing_newline: false,
                };
            }
        }
    }
}

/// Joins lines back into text with `\n` separators, appending a final
/// newline iff `trailing_newline` is set.
#[must_use]
pub fn join_lines(lines: &[String], trailing_newline: bool) -> String {
    let mut out = lines.join("\n");
    if trailing_newline && !lines.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_with_trailing_newline() {
        let l = split_lines("hi\n");
        assert_eq!(l.lines, vec!["hi"]);
        assert!(l.trailing_newline);
    }

    #[test]
    fn splits_without_trailing_newline() {
        let l = split_lines("hi");
        assert_eq!(l.lines, vec!["hi"]);
        assert!(!l.trailing_newline);
    }

    #[test]
    fn accepts_crlf() {
        let l = split_lines("a\r\nb\r\n");
        assert_eq!(l.lines, vec!["a", "b"]);
        assert!(l.trailing_newline);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let l = split_lines("");
        assert!(l.lines.is_empty());
        assert!(!l.trailing_newline);
    }

    #[test]
    fn round_trips() {
        for text in ["hi\n", "hi", "a\nb\nc\n", "a\nb\nc", ""] {
            let l = split_lines(text);
            assert_eq!(join_lines(&l.lines, l.trailing_newline), text);
        }
    }
}
