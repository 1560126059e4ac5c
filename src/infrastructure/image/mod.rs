//! Image handling infrastructure.
//!
//! This module provides:
//! - Decoding of local files and downloaded bytes
//! - The resource cache backing rendered previews
//! - Out-of-line HTTP fetching

pub mod decode;
pub mod http_fetcher;
pub mod resource_cache;

pub use decode::{decode_bytes, decode_file};
pub use http_fetcher::{HttpFetcherConfig, HttpImageFetcher, ImageFetchedEvent};
pub use resource_cache::{CacheStats, ImageResourceCache, Resolution};
