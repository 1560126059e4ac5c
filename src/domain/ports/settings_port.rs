//! Port for reading preview settings.

use crate::domain::entities::PreviewSettings;

/// Source of preview settings, consulted once per pass.
pub trait PreviewSettingsPort: Send + Sync {
    /// Returns the current settings.
    fn snapshot(&self) -> PreviewSettings;
}

impl PreviewSettingsPort for PreviewSettings {
    fn snapshot(&self) -> PreviewSettings {
        *self
    }
}
