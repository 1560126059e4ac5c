//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ImageRegion, PreviewId, PreviewSettings, SyncReport};
pub use errors::{DocumentError, PreviewError};
pub use ports::{ImageFetchPort, LinkResolverPort, PreviewDocument, PreviewSettingsPort};
