//! Source locators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, hierarchical locator of a data source.
///
/// Segments are separated by `/`. A source *covers* itself and every
/// descendant, so an observer registered on `artists` hears about changes to
/// `artists/42` too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a change to `other` concerns observers of `self`.
    pub fn covers(&self, other: &Source) -> bool {
        let base = self.0.trim_end_matches('/');
        match other.0.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || base.is_empty(),
            None => false,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Source> for Source {
    fn from(s: &Source) -> Self {
        s.clone()
    }
}
