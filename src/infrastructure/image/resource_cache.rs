//! Decoded image cache keyed by resolved path.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, trace, warn};

use crate::domain::entities::{CachedImage, LinkKind, ResourceName};
use crate::domain::errors::PreviewError;
use crate::domain::ports::{CacheResult, ImageFetchPort};

use super::decode::{decode_bytes, decode_file};

/// Outcome of resolving a path through the cache.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Decoded image available now.
    Ready(CachedImage),
    /// Remote fetch in flight; nothing to display yet.
    Pending,
    /// Cannot be displayed on this pass.
    Unavailable(PreviewError),
}

impl Resolution {
    /// Returns the image if ready.
    #[must_use]
    pub fn ready(self) -> Option<CachedImage> {
        match self {
            Self::Ready(image) => Some(image),
            Self::Pending | Self::Unavailable(_) => None,
        }
    }
}

/// Maps resolved paths to decoded images and their display handles.
///
/// Unbounded by default, so entries live for the whole editing session. A
/// capacity turns it into an LRU; evicted paths are decoded again on demand.
pub struct ImageResourceCache {
    entries: LruCache<String, CachedImage>,
    by_resource: HashMap<ResourceName, String>,
    in_flight: HashSet<String>,
    fetcher: Arc<dyn ImageFetchPort>,
    hits: u64,
    misses: u64,
}

impl std::fmt::Debug for ImageResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResourceCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl ImageResourceCache {
    /// Creates a cache that fetches remote images through `fetcher`.
    /// `capacity` of `None` never evicts.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetchPort>, capacity: Option<usize>) -> Self {
        let entries = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            by_resource: HashMap::new(),
            in_flight: HashSet::new(),
            fetcher,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up or loads `path`.
    ///
    /// Local files are decoded synchronously. Remote URLs start at most one
    /// fetch while in flight and report [`Resolution::Pending`].
    pub fn resolve(&mut self, path: &str, kind: LinkKind) -> Resolution {
        if let Some(cached) = self.entries.get(path) {
            self.hits += 1;
            trace!(path = %path, "Resource cache hit");
            return Resolution::Ready(cached.clone());
        }
        self.misses += 1;

        match kind {
            LinkKind::Local => match decode_file(Path::new(path)) {
                Ok(img) => Resolution::Ready(self.insert(path, img)),
                Err(e) => {
                    debug!(path = %path, error = %e, "Local image unavailable");
                    Resolution::Unavailable(PreviewError::decode_failed(path, e.to_string()))
                }
            },
            LinkKind::Remote => {
                if self.in_flight.insert(path.to_string()) {
                    debug!(url = %path, "Fetching remote image");
                    self.fetcher.fetch(path);
                } else {
                    trace!(url = %path, "Fetch already in flight");
                }
                Resolution::Pending
            }
            LinkKind::Missing => Resolution::Unavailable(PreviewError::unresolvable(path)),
        }
    }

    /// Handles a finished fetch. Returns the new entry if one was inserted.
    ///
    /// Existing entries are never replaced, so a stale completion is a no-op.
    pub fn complete_fetch(
        &mut self,
        url: &str,
        result: CacheResult<bytes::Bytes>,
    ) -> Option<CachedImage> {
        self.in_flight.remove(url);

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "Remote image fetch failed");
                return None;
            }
        };

        if self.entries.contains(url) {
            trace!(url = %url, "Ignoring completion for cached image");
            return None;
        }

        match decode_bytes(&bytes) {
            Ok(img) => {
                debug!(url = %url, "Downloaded image cache insert");
                Some(self.insert(url, img))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Downloaded image failed to decode");
                None
            }
        }
    }

    fn insert(&mut self, path: &str, img: image::DynamicImage) -> CachedImage {
        let cached = CachedImage::new(path, img);
        self.by_resource
            .insert(cached.resource_name.clone(), path.to_string());
        if let Some((evicted_path, evicted)) = self.entries.push(path.to_string(), cached.clone()) {
            if evicted_path != path {
                self.by_resource.remove(&evicted.resource_name);
                debug!(path = %evicted_path, "Evicted image from resource cache");
            }
        }
        cached
    }

    /// Returns the cached entry for `path` without loading anything.
    pub fn lookup(&mut self, path: &str) -> Option<CachedImage> {
        self.entries.get(path).cloned()
    }

    /// Returns the decoded image published under `name`.
    #[must_use]
    pub fn image(&self, name: &ResourceName) -> Option<Arc<image::DynamicImage>> {
        let path = self.by_resource.get(name)?;
        self.entries.peek(path).map(|cached| cached.image.clone())
    }

    /// Returns true if `url` has a fetch in flight.
    #[must_use]
    pub fn is_pending(&self, url: &str) -> bool {
        self.in_flight.contains(url)
    }

    /// Number of fetches in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of decoded images held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            (self.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            size: self.entries.len(),
            pending: self.in_flight.len(),
        }
    }

    /// Drops every decoded image. In-flight fetches keep running and may
    /// repopulate the cache on completion.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_resource.clear();
        debug!("Cleared image resource cache");
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Fetches in flight.
    pub pending: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {} pending, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.pending, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::domain::ports::{CacheError, MockImageFetchPort};

    fn png_bytes(width: u32) -> bytes::Bytes {
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(width, 4)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        bytes::Bytes::from(out.into_inner())
    }

    fn idle_fetcher() -> Arc<dyn ImageFetchPort> {
        Arc::new(MockImageFetchPort::new())
    }

    #[test]
    fn test_pending_remote_fetched_once() {
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(1).return_const(());
        let mut cache = ImageResourceCache::new(Arc::new(fetcher), None);

        let first = cache.resolve("https://example.com/a.png", LinkKind::Remote);
        let second = cache.resolve("https://example.com/a.png", LinkKind::Remote);

        assert!(matches!(first, Resolution::Pending));
        assert!(matches!(second, Resolution::Pending));
        assert!(cache.is_pending("https://example.com/a.png"));
    }

    #[test]
    fn test_completion_inserts_entry() {
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(1).return_const(());
        let mut cache = ImageResourceCache::new(Arc::new(fetcher), None);
        let url = "https://example.com/a.png";

        cache.resolve(url, LinkKind::Remote);
        let inserted = cache.complete_fetch(url, Ok(png_bytes(64)));

        assert_eq!(inserted.map(|c| c.natural_width), Some(64));
        assert!(!cache.is_pending(url));
        let ready = cache.resolve(url, LinkKind::Remote).ready().unwrap();
        assert_eq!(ready.natural_width, 64);
    }

    #[test]
    fn test_stale_completion_keeps_first_entry() {
        let mut cache = ImageResourceCache::new(idle_fetcher(), None);
        let url = "https://example.com/a.png";

        cache.complete_fetch(url, Ok(png_bytes(64)));
        let second = cache.complete_fetch(url, Ok(png_bytes(128)));

        assert!(second.is_none());
        assert_eq!(cache.lookup(url).map(|c| c.natural_width), Some(64));
    }

    #[test]
    fn test_failed_fetch_caches_nothing() {
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(2).return_const(());
        let mut cache = ImageResourceCache::new(Arc::new(fetcher), None);
        let url = "https://example.com/a.png";

        cache.resolve(url, LinkKind::Remote);
        let result = cache.complete_fetch(url, Err(CacheError::NetworkError("HTTP 404".into())));

        assert!(result.is_none());
        assert!(cache.is_empty());
        // A later pass issues one fresh attempt.
        assert!(matches!(cache.resolve(url, LinkKind::Remote), Resolution::Pending));
    }

    #[test]
    fn test_undecodable_download_caches_nothing() {
        let mut cache = ImageResourceCache::new(idle_fetcher(), None);
        let result = cache.complete_fetch(
            "https://example.com/a.png",
            Ok(bytes::Bytes::from_static(b"<html>")),
        );
        assert!(result.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_local_decode_and_memoize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, png_bytes(200)).unwrap();
        let path = path.to_string_lossy().to_string();
        let mut cache = ImageResourceCache::new(idle_fetcher(), None);

        let first = cache.resolve(&path, LinkKind::Local).ready().unwrap();
        let second = cache.resolve(&path, LinkKind::Local).ready().unwrap();

        assert_eq!(first.natural_width, 200);
        assert!(Arc::ptr_eq(&first.image, &second.image));
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.image(&first.resource_name).is_some());
    }

    #[test]
    fn test_local_decode_failure_is_retried_next_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"not a png").unwrap();
        let path_str = path.to_string_lossy().to_string();
        let mut cache = ImageResourceCache::new(idle_fetcher(), None);

        let first = cache.resolve(&path_str, LinkKind::Local);
        assert!(matches!(
            first,
            Resolution::Unavailable(PreviewError::DecodeFailed { .. })
        ));
        assert!(cache.is_empty());

        std::fs::write(&path, png_bytes(30)).unwrap();
        let second = cache.resolve(&path_str, LinkKind::Local).ready();
        assert_eq!(second.map(|c| c.natural_width), Some(30));
    }

    #[test]
    fn test_bounded_cache_evicts_and_unpublishes() {
        let mut cache = ImageResourceCache::new(idle_fetcher(), Some(1));

        let a = cache
            .complete_fetch("https://example.com/a.png", Ok(png_bytes(10)))
            .unwrap();
        cache.complete_fetch("https://example.com/b.png", Ok(png_bytes(20)));

        assert_eq!(cache.len(), 1);
        assert!(cache.image(&a.resource_name).is_none());
        assert!(cache.lookup("https://example.com/a.png").is_none());
    }

    #[test]
    fn test_clear() {
        let mut cache = ImageResourceCache::new(idle_fetcher(), None);
        let a = cache
            .complete_fetch("https://example.com/a.png", Ok(png_bytes(10)))
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.image(&a.resource_name).is_none());
    }
}
