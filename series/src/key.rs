//! Path-key codec.
//!
//! Every persisted entity is addressed by a `/`-joined path key:
//! `id` for identifier markers, `id/type` for type markers, and
//! `id/type/timestamp` for data points. The codec joins and splits those
//! segments; segment values are otherwise opaque strings.

use crate::error::{Error, Result};

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// Wildcard segment appended by [`compose_prefix`] for the next level.
pub const WILDCARD: &str = "*";

/// Composes the full key for a data point.
///
/// The timestamp is rendered as its decimal epoch-millisecond value.
pub fn compose(id: &str, type_name: &str, timestamp: i64) -> String {
    format!("{id}{SEPARATOR}{type_name}{SEPARATOR}{timestamp}")
}

/// Composes a prefix pattern that fixes the leading segments and wildcards
/// the next level: `id/*` when only the id is given, `id/type/*` when both
/// are.
pub fn compose_prefix(id: &str, type_name: Option<&str>) -> String {
    match type_name {
        Some(type_name) => format!("{id}{SEPARATOR}{type_name}{SEPARATOR}{WILDCARD}"),
        None => format!("{id}{SEPARATOR}{WILDCARD}"),
    }
}

/// Splits a data-point key back into its `(id, type, timestamp)` parts.
///
/// Fails with [`Error::MalformedKey`] when the key has fewer than three
/// segments or the timestamp segment is not a decimal integer.
pub fn decompose(key: &str) -> Result<(String, String, i64)> {
    let mut segments = key.splitn(3, SEPARATOR);
    let (Some(id), Some(type_name), Some(rest)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return Err(Error::MalformedKey {
            key: key.to_string(),
            reason: "expected three `/`-separated segments".to_string(),
        });
    };
    let timestamp: i64 = rest.parse().map_err(|_| Error::MalformedKey {
        key: key.to_string(),
        reason: format!("timestamp segment `{rest}` is not an integer"),
    })?;
    Ok((id.to_string(), type_name.to_string(), timestamp))
}

/// Validates a single `id` or `type` segment before it is merged into a key.
///
/// Segments must be non-empty and must not contain the separator or the
/// glob metacharacters, which would corrupt the composed key.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::MalformedKey {
            key: segment.to_string(),
            reason: "empty segment".to_string(),
        });
    }
    if let Some(bad) = segment.chars().find(|c| matches!(c, '/' | '*' | '?')) {
        return Err(Error::MalformedKey {
            key: segment.to_string(),
            reason: format!("segment contains reserved character `{bad}`"),
        });
    }
    Ok(())
}
