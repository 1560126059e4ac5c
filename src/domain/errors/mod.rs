//! Domain error types.

mod document_error;
mod preview_error;

pub use document_error::DocumentError;
pub use preview_error::PreviewError;
