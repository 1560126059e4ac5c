//! Offset-addressed document buffer.

pub mod text_document;

pub use text_document::{DEFAULT_VIEWPORT_WIDTH, TextDocument};
