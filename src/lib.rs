//! mdpreview - inline image previews for markdown documents.
//!
//! This crate keeps placeholder markers in an editable document in sync with
//! the image links it contains, loading local files and remote URLs into a
//! shared cache for the render layer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the reconciliation engine.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "mdpreview";
