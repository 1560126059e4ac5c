//! Preview reconciliation error types.
//!
//! None of these are fatal: the engine records them in the pass report and
//! moves on to the next region.

use serde::Serialize;
use thiserror::Error;

/// Per-region preview failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PreviewError {
    #[error("malformed region {start}..{end}: {reason}")]
    MalformedRegion {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("no single resolvable image link in {text:?}")]
    UnresolvableLink { text: String },

    #[error("failed to decode {path}: {message}")]
    DecodeFailed { path: String, message: String },

    #[error("failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("corrupted placeholder block at offset {offset}")]
    CorruptedPlaceholder { offset: usize },
}

impl PreviewError {
    /// Creates malformed region error.
    #[must_use]
    pub fn malformed(start: usize, end: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRegion {
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Creates unresolvable link error.
    #[must_use]
    pub fn unresolvable(text: impl Into<String>) -> Self {
        Self::UnresolvableLink { text: text.into() }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates fetch failure error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns whether a later pass over the same link may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DecodeFailed { .. } | Self::FetchFailed { .. })
    }
}
