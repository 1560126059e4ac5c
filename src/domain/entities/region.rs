//! Image-link regions reported by the extractor and the links derived from them.

use serde::{Deserialize, Serialize};

use super::{LinkKind, PreviewId};

/// Character-offset span holding exactly one image-link occurrence.
///
/// Offsets are `char` positions into the live document, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRegion {
    /// First character of the link syntax.
    pub start: usize,
    /// One past the last character of the link syntax.
    pub end: usize,
}

impl ImageRegion {
    /// Creates a new region.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered, zero for inverted spans.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `end` comes before `start`.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Returns true if both spans share at least one character.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Placement of a link relative to its containing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Offset right after the link text.
    pub offset: usize,
    /// Whether the link spans its whole block.
    pub is_block: bool,
}

/// A link extracted from one region during a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    /// Region start.
    pub start: usize,
    /// Region end.
    pub end: usize,
    /// True when the region spans its entire block.
    pub is_block: bool,
    /// Resolved path or URL of the link target.
    pub resolved_target: String,
    /// How the target resolved.
    pub kind: LinkKind,
    /// Preview already showing this target, if confirmed.
    pub matched_preview: Option<PreviewId>,
}

impl PendingLink {
    /// Where the placeholder for this link lives.
    #[must_use]
    pub const fn anchor(&self) -> Anchor {
        Anchor {
            offset: self.end,
            is_block: self.is_block,
        }
    }
}
