//! Reference name validation shared by the ref store and the repository
//! façade.

use crate::error::{Error, Result};

/// Names no ref, branch, or tag may ever use, reserved for pointer
/// semantics the core itself manages.
pub const RESERVED_NAMES: &[&str] = &["HEAD", "FETCH_HEAD", "ORIG_HEAD", "MERGE_HEAD"];

/// Validates a reference name against Git's naming rules: no `..`, no
/// leading `.`, no trailing `/`, no `@{`, no control characters, no
/// whitespace, and not a reserved name used as a branch/tag leaf.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("ref name must not be empty"));
    }
    if RESERVED_NAMES.contains(&name) {
        return Ok(());
    }
    if name.contains("..") {
        return Err(Error::invalid_name("ref name must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(Error::invalid_name("ref name must not contain '@{'"));
    }
    if name.starts_with('.') || name.ends_with('/') || name.ends_with('.') {
        return Err(Error::invalid_name(
            "ref name must not start with '.' or end with '/' or '.'",
        ));
    }
    if name.contains("//") {
        return Err(Error::invalid_name("ref name must not contain '//'"));
    }
    for ch in name.chars() {
        if ch.is_control() || ch == ' ' || ch == '~' || ch == '^' || ch == ':' || ch == '?' || ch == '*' || ch == '['
        {
            return Err(Error::invalid_name(format!(
                "ref name must not contain '{ch}'"
            )));
        }
    }
    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(Error::invalid_name("ref name must not have empty segments"));
        }
        if segment.starts_with('.') {
            return Err(Error::invalid_name(
                "ref name segments must not start with '.'",
            ));
        }
        if segment.ends_with(".lock") {
            return Err(Error::invalid_name(
                "ref name segments must not end with '.lock'",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_branch_names() {
        validate("refs/heads/main").unwrap();
        validate("refs/heads/feature/foo").unwrap();
        validate("HEAD").unwrap();
    }

    #[test]
    fn rejects_dotdot() {
        assert!(validate("refs/heads/../etc").is_err());
    }

    #[test]
    fn rejects_trailing_slash() {
        assert!(validate("refs/heads/main/").is_err());
    }

    #[test]
    fn rejects_leading_dot() {
        assert!(validate(".hidden").is_err());
    }

    #[test]
    fn rejects_at_brace() {
        assert!(validate("refs/heads/main@{1}").is_err());
    }

    #[test]
    fn rejects_control_chars() {
        assert!(validate("refs/heads/ma\tin").is_err());
    }
}
