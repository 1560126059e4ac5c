//! Application layer with the reconciliation engine and its helpers.

/// Engine and placeholder services.
pub mod services;

pub use services::{PreviewBlockManager, PreviewReconciler};
