//! Path matching logic.
//!
//! # Responsibilities
//! - Match exact paths (health, metrics and public endpoints)
//! - Match path prefixes on segment boundaries (API prefix)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefix `/api` matches `/api` and `/api/x`, never `/apix`
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches one path exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Matches a path prefix ending on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactPathMatcher::new("/check");
        assert!(matcher.matches("/check"));
        assert!(!matcher.matches("/check/"));
        assert!(!matcher.matches("/CHECK"));
    }

    #[test]
    fn test_prefix_matcher_respects_segments() {
        let matcher = PathPrefixMatcher::new("/api/login");
        assert!(matcher.matches("/api/login"));
        assert!(matcher.matches("/api/login/"));
        assert!(matcher.matches("/api/login/refresh"));
        assert!(!matcher.matches("/api/loginx"));
        assert!(!matcher.matches("/api"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let matcher = PathPrefixMatcher::new("/api/");
        assert_eq!(matcher.prefix(), "/api");
        assert!(matcher.matches("/api/data"));
        assert!(!matcher.matches("/apis"));

        let root = PathPrefixMatcher::new("/");
        assert!(root.matches("/anything"));
    }
}
