//! Settings handle the host can update between passes.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::entities::PreviewSettings;
use crate::domain::ports::PreviewSettingsPort;

/// Shared, updatable preview settings.
#[derive(Debug, Clone, Default)]
pub struct SharedPreviewSettings {
    inner: Arc<RwLock<PreviewSettings>>,
}

impl SharedPreviewSettings {
    /// Creates a handle holding `settings`.
    #[must_use]
    pub fn new(settings: PreviewSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replaces the settings; the next pass picks them up.
    pub fn set(&self, settings: PreviewSettings) {
        debug!(?settings, "Preview settings updated");
        *self.inner.write() = settings;
    }

    /// Applies `change` to the current settings.
    pub fn update(&self, change: impl FnOnce(&mut PreviewSettings)) {
        let mut guard = self.inner.write();
        change(&mut *guard);
        debug!(settings = ?*guard, "Preview settings updated");
    }
}

impl PreviewSettingsPort for SharedPreviewSettings {
    fn snapshot(&self) -> PreviewSettings {
        *self.inner.read()
    }
}
