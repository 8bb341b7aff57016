//! Request path canonicalization.
//!
//! Classification, body rules, scoring and forwarding all see the same
//! canonical path: repeated and trailing slashes collapsed, `.` and `..`
//! segments (literal or percent-encoded) resolved. Paths that climb above
//! the root or smuggle an encoded separator are rejected.

/// Why a request path was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path must be absolute")]
    Relative,

    #[error("path escapes the root")]
    Traversal,

    #[error("path contains an encoded separator")]
    EncodedSeparator,
}

/// Canonical form of a request path.
pub fn canonical_path(raw: &str) -> Result<String, PathError> {
    if !raw.starts_with('/') {
        return Err(PathError::Relative);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        if has_encoded_separator(segment) {
            return Err(PathError::EncodedSeparator);
        }
        match decode_dots(segment).as_str() {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Traversal);
                }
            }
            _ => segments.push(segment),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

fn has_encoded_separator(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    segment.contains('\\') || lower.contains("%2f") || lower.contains("%5c")
}

// Only dot escapes matter for segment resolution.
fn decode_dots(segment: &str) -> String {
    segment.to_ascii_lowercase().replace("%2e", ".")
}
