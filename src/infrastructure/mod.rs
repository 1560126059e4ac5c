//! Infrastructure layer with adapters for files, HTTP and configuration.

/// Application configuration.
pub mod config;
/// In-memory document buffer.
pub mod document;
/// Image decoding, caching and fetching.
pub mod image;
/// Markdown scanning.
pub mod markdown;
/// Link target resolution.
pub mod resolver;

pub use config::{AppConfig, CliArgs, LogLevel, SharedPreviewSettings, StorageManager};
pub use document::TextDocument;
pub use self::image::{HttpFetcherConfig, HttpImageFetcher, ImageFetchedEvent, ImageResourceCache};
pub use markdown::RegionExtractor;
pub use resolver::FsLinkResolver;
