//! Document mutation error types.

use thiserror::Error;

/// Errors raised by an offset-addressed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum DocumentError {
    #[error("offset {offset} out of bounds (length {len})")]
    OutOfBounds { offset: usize, len: usize },

    #[error("invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    #[error("no placeholder marker at offset {offset}")]
    NotAMarker { offset: usize },
}
