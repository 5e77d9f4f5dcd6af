//! Swappable file views and the built-in file info view.

use crate::setting::{SettingBuilder, SettingKind, SettingsCollection};
use log::warn;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Name of the fallback view every browser registers first.
pub const FILE_INFO_VIEW: &str = "file_info";

/// Lazily set up presentation unit for one kind of file.
pub trait DataView {
    /// Unique view name; its settings live under `view/<name>/`.
    fn name(&self) -> &str;

    fn settings(&self) -> &SettingsCollection;

    /// One-time setup, run on first activation.
    fn setup(&mut self) {}

    /// Whether this view can present `path`. Used by auto-selection.
    fn is_file_supported(&self, _path: &Path) -> bool {
        false
    }

    fn on_change_data_filename(&mut self, path: &Path);

    /// Text currently presented, if any.
    fn status(&self) -> Option<String> {
        None
    }
}

/// Metadata snapshot of one file system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: u64,
    pub is_dir: bool,
    pub extension: Option<String>,
    pub modified_unix_secs: Option<u64>,
}

impl FileInfo {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified_unix_secs = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs());
        Ok(Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            size_bytes: metadata.len(),
            is_dir: metadata.is_dir(),
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned()),
            modified_unix_secs,
        })
    }

    pub fn summary(&self, human_readable: bool) -> String {
        let size = if human_readable {
            human_size(self.size_bytes)
        } else {
            format!("{} B", self.size_bytes)
        };
        let kind = if self.is_dir { "directory" } else { "file" };
        let mut lines = vec![
            format!("name: {}", self.name),
            format!("kind: {kind}"),
            format!("size: {size}"),
        ];
        if let Some(extension) = &self.extension {
            lines.push(format!("extension: {extension}"));
        }
        if let Some(modified) = self.modified_unix_secs {
            lines.push(format!("modified: {modified}"));
        }
        lines.join("\n")
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Generic fallback view: shows name, size, kind and modification time.
#[derive(Debug)]
pub struct FileInfoView {
    settings: SettingsCollection,
    info: Option<FileInfo>,
}

impl FileInfoView {
    pub fn new() -> Self {
        let settings = SettingsCollection::for_view(FILE_INFO_VIEW);
        if let Err(err) = settings.new_setting(
            SettingBuilder::new("human_readable_size", SettingKind::Bool)
                .initial(true)
                .description("show sizes in KiB/MiB instead of bytes"),
        ) {
            warn!("event=view_settings module=browser status=error view={FILE_INFO_VIEW} error={err}");
        }
        Self {
            settings,
            info: None,
        }
    }

    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    fn human_readable(&self) -> bool {
        self.settings
            .get("human_readable_size")
            .and_then(|setting| setting.value().as_bool())
            .unwrap_or(true)
    }
}

impl Default for FileInfoView {
    fn default() -> Self {
        Self::new()
    }
}

impl DataView for FileInfoView {
    fn name(&self) -> &str {
        FILE_INFO_VIEW
    }

    fn settings(&self) -> &SettingsCollection {
        &self.settings
    }

    fn on_change_data_filename(&mut self, path: &Path) {
        self.info = match FileInfo::read(path) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(
                    "event=file_info module=browser status=error path={} error={}",
                    path.display(),
                    err
                );
                None
            }
        };
    }

    fn status(&self) -> Option<String> {
        self.info
            .as_ref()
            .map(|info| info.summary(self.human_readable()))
    }
}
