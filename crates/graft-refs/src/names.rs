//! Ref namespace constants and name validation following git conventions.
//!
//! A valid full ref name is either `HEAD` or starts with `refs/` and obeys
//! these rules:
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not end with `.`, `/` or `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, Result};

/// The symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";
/// Prefix of local branches.
pub const R_HEADS: &str = "refs/heads/";
/// Prefix of tags.
pub const R_TAGS: &str = "refs/tags/";

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full ref name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use graft_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("HEAD").is_ok());
/// assert!(validate_ref_name("refs/heads/feature/auth").is_ok());
/// assert!(validate_ref_name("main").is_err());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name == HEAD {
        return Ok(());
    }
    if !name.starts_with("refs/") {
        return Err(invalid(name, "must be HEAD or start with 'refs/'"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('.') || name.ends_with('/') {
        return Err(invalid(name, "must not end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

/// The short branch name of a `refs/heads/*` ref.
pub fn branch_name(full: &str) -> Option<&str> {
    full.strip_prefix(R_HEADS)
}

/// The short tag name of a `refs/tags/*` ref.
pub fn tag_name(full: &str) -> Option<&str> {
    full.strip_prefix(R_TAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_ref_name("HEAD").is_ok());
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("refs/heads/feature/deep/nested").is_ok());
        assert!(validate_ref_name("refs/tags/v1.0").is_ok());
        assert!(validate_ref_name("refs/remotes/origin/main").is_ok());
    }

    #[test]
    fn reject_outside_namespace() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("main").is_err());
        assert!(validate_ref_name("head").is_err());
    }

    #[test]
    fn reject_double_dot() {
        assert!(validate_ref_name("refs/heads/bad..name").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for name in [
            "refs/heads/a b",
            "refs/heads/a~b",
            "refs/heads/a^b",
            "refs/heads/a:b",
            "refs/heads/a?b",
            "refs/heads/a*b",
            "refs/heads/a[b",
            "refs/heads/a\\b",
        ] {
            assert!(validate_ref_name(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn reject_bad_endings() {
        assert!(validate_ref_name("refs/heads/trailing.").is_err());
        assert!(validate_ref_name("refs/heads/trailing/").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
    }

    #[test]
    fn reject_bad_components() {
        assert!(validate_ref_name("refs/heads//b").is_err());
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
        assert!(validate_ref_name("refs/heads/x@{0}").is_err());
    }

    #[test]
    fn short_names() {
        assert_eq!(branch_name("refs/heads/topic/x"), Some("topic/x"));
        assert_eq!(branch_name("refs/tags/v1"), None);
        assert_eq!(tag_name("refs/tags/v1"), Some("v1"));
        assert_eq!(tag_name(HEAD), None);
    }
}
