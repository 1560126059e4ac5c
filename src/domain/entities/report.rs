//! Outcome of one reconciliation pass.

use serde::Serialize;

use super::ImageRegion;
use crate::domain::errors::PreviewError;

/// A region the pass could not preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRegion {
    /// The region as reported.
    pub region: ImageRegion,
    /// Why it was skipped.
    pub error: PreviewError,
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Generation after the pass.
    pub generation: u64,
    /// The region list matched the previous pass; nothing was done.
    pub deduplicated: bool,
    /// Placeholders materialized.
    pub created: usize,
    /// Placeholders confirmed in place.
    pub reused: usize,
    /// Placeholders whose width was updated.
    pub resized: usize,
    /// Placeholders removed.
    pub removed: usize,
    /// Corrupted placeholder blocks repaired.
    pub repaired: usize,
    /// Links waiting on a remote fetch.
    pub pending: usize,
    /// Regions skipped with their reason.
    pub skipped: Vec<SkippedRegion>,
}

impl SyncReport {
    /// Creates an empty report for `generation`.
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Report for a pass short-circuited by identical regions.
    #[must_use]
    pub fn deduplicated(generation: u64) -> Self {
        Self {
            generation,
            deduplicated: true,
            ..Self::default()
        }
    }

    /// Records a skipped region.
    pub fn skip(&mut self, region: ImageRegion, error: PreviewError) {
        self.skipped.push(SkippedRegion { region, error });
    }

    /// Returns true if the pass changed document structure.
    #[must_use]
    pub const fn mutated(&self) -> bool {
        self.created > 0 || self.removed > 0 || self.repaired > 0
    }
}
