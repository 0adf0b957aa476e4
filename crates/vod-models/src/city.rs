//! City descriptors loaded from the mount registry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique identifier for a member city.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub String);

impl CityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static configuration for one member city: mount path and title patterns.
///
/// Loaded once at startup into an immutable registry; never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDescriptor {
    pub id: CityId,
    pub name: String,
    pub mount_path: PathBuf,
    /// Case-insensitive substring patterns used for opt-in title filtering.
    #[serde(default)]
    pub title_patterns: Vec<String>,
}

impl CityDescriptor {
    /// True if any configured title pattern matches `title` (case-insensitive substring, any-of).
    ///
    /// Patterns are only applied when the caller explicitly opts in; absent patterns
    /// this always returns true (no filtering).
    pub fn title_matches(&self, title: &str) -> bool {
        if self.title_patterns.is_empty() {
            return true;
        }
        let lowered = title.to_lowercase();
        self.title_patterns
            .iter()
            .any(|pat| lowered.contains(&pat.to_lowercase()))
    }
}
