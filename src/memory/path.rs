//! Hierarchical node addressing (`/strata/category/id`).
//!
//! Paths imply a tree but lookups never require a parent to exist.

use super::error::StoreError;

pub const SEPARATOR: char = '/';

/// Check that `path` is a well-formed node address: leading `/`, no empty,
/// `.` or `..` segments, no trailing separator. The root `/` itself is not a
/// node address.
pub fn validate(path: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let rest = path
        .strip_prefix(SEPARATOR)
        .ok_or_else(|| invalid("must start with '/'"))?;
    if rest.is_empty() {
        return Err(invalid("root is not addressable"));
    }
    for segment in rest.split(SEPARATOR) {
        match segment {
            "" => return Err(invalid("empty segment")),
            "." | ".." => return Err(invalid("relative segment")),
            s if s.contains('\0') || s.contains('\\') => {
                return Err(invalid("illegal character in segment"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Path segments, without the leading separator.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_start_matches(SEPARATOR)
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
}

/// Parent address, or `None` for top-level nodes.
pub fn parent(path: &str) -> Option<&str> {
    let idx = path.rfind(SEPARATOR)?;
    if idx == 0 {
        None
    } else {
        Some(&path[..idx])
    }
}

/// Last segment of the path.
pub fn name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Join a base path with further segments.
pub fn join(base: &str, segment: &str) -> String {
    format!(
        "{}{}{}",
        base.trim_end_matches(SEPARATOR),
        SEPARATOR,
        segment.trim_start_matches(SEPARATOR)
    )
}

/// True if `path` equals `prefix` or lies beneath it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}
