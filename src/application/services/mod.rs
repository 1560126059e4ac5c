//! Preview reconciliation services.

pub mod block_manager;
pub mod link_parser;
pub mod preview_width;
pub mod reconciler;

pub use block_manager::{PlaceholderSite, PreviewBlockManager};
pub use link_parser::{IMAGE_LINK_RE, count_image_links, single_image_target};
pub use preview_width::{available_width, desired_width};
pub use reconciler::PreviewReconciler;
