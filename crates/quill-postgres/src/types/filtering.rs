//! Filter options for media listings.

use serde::{Deserialize, Serialize};

use crate::types::MediaKind;

/// Filter applied when listing media records.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFilter {
    /// Restrict to a single classification.
    pub kind: Option<MediaKind>,
    /// Case-insensitive substring match against the storage key.
    pub name_contains: Option<String>,
}

impl MediaFilter {
    /// Returns an empty filter matching everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts the filter to one classification.
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts the filter to keys containing the given fragment.
    pub fn with_name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Returns whether the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.name_contains.is_none()
    }
}
