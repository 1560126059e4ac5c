//! Domain entity definitions.

mod document;
mod image;
mod preview;
mod region;
mod report;
mod settings;

pub use document::BlockSpan;
pub use self::image::{CachedImage, LinkKind, LinkTarget, ResourceName};
pub use preview::{PLACEHOLDER_MARKER, PlaceholderFormat, PreviewEntry, PreviewId};
pub use region::{Anchor, ImageRegion, PendingLink};
pub use report::{SkippedRegion, SyncReport};
pub use settings::{DEFAULT_MIN_PREVIEW_WIDTH, DEFAULT_WIDTH_MARGIN, PreviewSettings};
