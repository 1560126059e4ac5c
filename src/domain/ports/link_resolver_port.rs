//! Port for turning raw link text into a path or URL.

use crate::domain::entities::LinkTarget;

/// Resolves raw link targets relative to the document's location.
pub trait LinkResolverPort: Send + Sync {
    /// Resolves `raw` into a local path, a remote URL or nothing.
    fn resolve(&self, raw: &str) -> LinkTarget;
}
