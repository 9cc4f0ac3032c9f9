//! Stable artifact locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, prefix-addressed reference to stored bytes.
///
/// Locations are stable identifiers handed verbatim from stage to stage.
/// The store decides what they mean physically; the orchestrator only
/// composes them with [`Location::join`] and compares them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Creates a location from a raw reference string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The location as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a path segment, normalizing the joining slash.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let base = self.0.trim_end_matches('/');
        let segment = segment.trim_start_matches('/');
        Self(format!("{base}/{segment}"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
