//! Port definition for remote image fetching.

/// Result type for fetch and decode operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while obtaining image bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Failed to decode image.
    #[error("Decode error: {0}")]
    DecodeError(String),
    /// I/O error while reading a local file.
    #[error("IO error: {0}")]
    IoError(String),
    /// Network error during download.
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Fire-and-forget fetching of remote images.
///
/// Implementations deliver completion out of band; the owner forwards it to
/// the engine on the thread that owns the document.
#[cfg_attr(test, mockall::automock)]
pub trait ImageFetchPort: Send + Sync {
    /// Starts downloading `url`.
    fn fetch(&self, url: &str);
}
