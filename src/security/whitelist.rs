//! Authentication whitelist.

use std::collections::HashSet;

/// Exact-match set of paths that skip token authentication.
#[derive(Debug, Clone, Default)]
pub struct WhitelistAuthorizer {
    paths: HashSet<String>,
}

impl WhitelistAuthorizer {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the path is whitelisted. No prefix or wildcard expansion.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
