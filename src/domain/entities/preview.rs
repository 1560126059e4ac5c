//! Preview identity and the format carried by placeholder markers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ResourceName;

/// Glyph embedded in the document for every placeholder.
pub const PLACEHOLDER_MARKER: char = '\u{FFFC}';

/// Identifier of a materialized preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PreviewId(pub u64);

impl PreviewId {
    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine-side record of a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    /// Preview identifier, also stored in the marker format.
    pub id: PreviewId,
    /// Last pass that confirmed this preview.
    pub generation: u64,
    /// Path or URL the preview displays.
    pub resolved_path: String,
}

impl PreviewEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(id: PreviewId, generation: u64, resolved_path: impl Into<String>) -> Self {
        Self {
            id,
            generation,
            resolved_path: resolved_path.into(),
        }
    }

    /// Returns true if the entry was not confirmed by pass `generation`.
    #[must_use]
    pub const fn is_stale(&self, generation: u64) -> bool {
        self.generation < generation
    }
}

/// Format attached to a placeholder marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderFormat {
    /// Handle the render layer uses to find the decoded image.
    pub resource_name: ResourceName,
    /// Path or URL shown by this placeholder.
    pub resolved_path: String,
    /// Preview this marker belongs to.
    pub preview_id: PreviewId,
    /// Rendered width in pixels.
    pub width: u32,
}
