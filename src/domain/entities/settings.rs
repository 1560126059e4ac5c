//! Preview settings snapshot read once per pass.

use serde::{Deserialize, Serialize};

/// Default horizontal space kept free beside a constrained preview.
pub const DEFAULT_WIDTH_MARGIN: u32 = 50;

/// Default floor for the available preview width.
pub const DEFAULT_MIN_PREVIEW_WIDTH: u32 = 100;

/// Settings the engine consults at the start of every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Render image previews at all.
    pub enable_preview: bool,
    /// Shrink previews wider than the viewport.
    pub constrain_width: bool,
    /// Pixels subtracted from the viewport width.
    pub width_margin: u32,
    /// Lower bound for the available width.
    pub min_width: u32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            enable_preview: true,
            constrain_width: true,
            width_margin: DEFAULT_WIDTH_MARGIN,
            min_width: DEFAULT_MIN_PREVIEW_WIDTH,
        }
    }
}
