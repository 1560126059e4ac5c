//! Domain types for decoded images and resolved link targets.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable handle under which a decoded image is published to the render layer.
/// Generated from a hash of the resolved path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Derives the resource name for a resolved path or URL.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded image held by the resource cache.
#[derive(Debug, Clone)]
pub struct CachedImage {
    /// Handle for the render layer.
    pub resource_name: ResourceName,
    /// Width recorded at decode time.
    pub natural_width: u32,
    /// The decoded pixels.
    pub image: Arc<image::DynamicImage>,
}

impl CachedImage {
    /// Wraps a freshly decoded image for `path`.
    #[must_use]
    pub fn new(path: &str, image: image::DynamicImage) -> Self {
        Self {
            resource_name: ResourceName::from_path(path),
            natural_width: image.width(),
            image: Arc::new(image),
        }
    }
}

/// Where a link target lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Existing file on the local filesystem.
    Local,
    /// Remote URL that must be fetched.
    Remote,
    /// Neither an existing file nor a fetchable URL.
    Missing,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Result of resolving a raw link string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Target kind.
    pub kind: LinkKind,
    /// Absolute path or canonical URL; the raw text when missing.
    pub path: String,
}

impl LinkTarget {
    /// Creates a local target.
    #[must_use]
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            kind: LinkKind::Local,
            path: path.into(),
        }
    }

    /// Creates a remote target.
    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            kind: LinkKind::Remote,
            path: url.into(),
        }
    }

    /// Creates a missing target.
    #[must_use]
    pub fn missing(raw: impl Into<String>) -> Self {
        Self {
            kind: LinkKind::Missing,
            path: raw.into(),
        }
    }

    /// Returns true if the target can be previewed.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self.kind, LinkKind::Missing)
    }
}
