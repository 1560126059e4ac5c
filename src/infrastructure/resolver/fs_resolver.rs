//! Filesystem-backed link resolution.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use reqwest::Url;
use tracing::trace;

use crate::domain::entities::LinkTarget;
use crate::domain::ports::LinkResolverPort;

/// Resolves link targets against the directory of the edited file.
#[derive(Debug, Clone)]
pub struct FsLinkResolver {
    base_dir: PathBuf,
}

impl FsLinkResolver {
    /// Creates a resolver rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn existing_file(&self, candidate: &str) -> Option<PathBuf> {
        let joined = self.base_dir.join(candidate);
        if !joined.is_file() {
            return None;
        }
        let absolute = std::path::absolute(&joined).unwrap_or(joined);
        Some(clean_path(&absolute))
    }
}

impl LinkResolverPort for FsLinkResolver {
    fn resolve(&self, raw: &str) -> LinkTarget {
        let raw = raw.trim();
        if raw.is_empty() {
            return LinkTarget::missing(raw);
        }

        let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
        let local = self
            .existing_file(&decoded)
            .or_else(|| (decoded != raw).then(|| self.existing_file(raw)).flatten());
        if let Some(path) = local {
            trace!(raw = %raw, path = %path.display(), "Resolved local image");
            return LinkTarget::local(path.to_string_lossy());
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => LinkTarget::remote(url.as_str()),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) if path.is_file() => LinkTarget::local(clean_path(&path).to_string_lossy()),
                _ => LinkTarget::missing(raw),
            },
            _ => LinkTarget::missing(raw),
        }
    }
}

/// Lexically normalizes `.` and `..` components.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
