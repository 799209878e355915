//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Understand the `/**` subtree suffix used in route declarations
//! - Compute the forwarded path when the prefix is stripped
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/h5/**` matches `/h5` itself and anything under `/h5/`
//! - A pattern without the wildcard is a literal `starts_with` prefix
//! - No regex to guarantee O(n) matching

const SUBTREE_SUFFIX: &str = "/**";

/// Matches the request path against a configured route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    /// Literal prefix, without the wildcard (e.g. `/h5` for `/h5/**`).
    prefix: String,
    /// Whether the pattern ended in `/**`.
    subtree: bool,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher from a route path.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        match pattern.strip_suffix(SUBTREE_SUFFIX) {
            Some(base) => Self {
                prefix: base.to_string(),
                subtree: true,
            },
            None => Self {
                prefix: pattern,
                subtree: false,
            },
        }
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if !self.subtree {
            return path.starts_with(&self.prefix);
        }
        match path.strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Path left after removing the matched prefix, always starting with `/`.
    ///
    /// A trailing `/` of a literal prefix is treated as part of the remainder
    /// so `/api/` applied to `/api/users` yields `/users`.
    pub fn strip(&self, path: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        let rest = path.strip_prefix(prefix).unwrap_or(path);
        if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        }
    }

    /// The literal prefix this matcher compares against.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
