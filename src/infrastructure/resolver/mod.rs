//! Link target resolution.

pub mod fs_resolver;

pub use fs_resolver::{FsLinkResolver, clean_path};
