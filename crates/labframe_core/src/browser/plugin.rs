//! Plugins notified on every file-selection change.

use crate::setting::SettingsCollection;
use std::path::Path;

/// Independent unit reacting to the selected file, regardless of which
/// view is active.
pub trait BrowserPlugin {
    /// Unique plugin name; its settings live under `plugin/<name>/`.
    fn name(&self) -> &str;

    fn settings(&self) -> &SettingsCollection;

    /// Hidden plugins skip updates until shown again.
    fn is_showing(&self) -> bool {
        true
    }

    fn update(&mut self, data_filename: &Path);

    /// Update callback registered with the browser.
    fn update_if_showing(&mut self, data_filename: &Path) {
        if self.is_showing() {
            self.update(data_filename);
        }
    }
}
