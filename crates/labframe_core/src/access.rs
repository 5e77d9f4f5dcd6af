//! Path-addressed read/write over any setting container.
//!
//! # Responsibility
//! - Provide the two write tiers (`write_setting` / `write_setting_safe`).
//! - Provide bulk reads, bulk safe writes and value proposals.
//! - Round-trip settings through INI files.
//!
//! # Invariants
//! - The safe tier never changes a protected setting.
//! - Bulk operations are total over their input: each path gets its own
//!   result and one failure never aborts the rest.
//! - Loading a file proposes every loaded value under the file name, even
//!   for protected or missing paths.

use crate::ini::{self, IniError};
use crate::setting::{Setting, SettingError, SettingValue};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Outcome of one setting write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    Success,
    PathMissing,
    Protected,
}

impl WriteResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PathMissing => "path_missing",
            Self::Protected => "protected",
        }
    }
}

impl Display for WriteResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-path outcome of a bulk write. `Err` marks a value the setting kind
/// rejected.
pub type WriteReport = BTreeMap<String, Result<WriteResult, SettingError>>;

/// Result of [`SettingAccess::settings_load_ini`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Raw values as read from the file.
    pub values: BTreeMap<String, String>,
    /// Safe-write outcome for every loaded path.
    pub writes: WriteReport,
}

impl LoadReport {
    /// Paths whose value was applied.
    pub fn applied(&self) -> Vec<&str> {
        self.writes
            .iter()
            .filter(|(_, result)| matches!(result, Ok(WriteResult::Success)))
            .map(|(path, _)| path.as_str())
            .collect()
    }
}

/// Read/write contract for containers that resolve setting paths.
///
/// Implementors supply path resolution; every other operation is derived.
pub trait SettingAccess {
    /// Resolves `path` to a setting. May lazily set up the owner.
    fn lookup_setting(&mut self, path: &str) -> Option<Setting>;

    /// Every registered path, sorted.
    fn setting_paths(&self) -> Vec<String>;

    /// Called after each successful write through this trait.
    fn settings_written(&mut self) {}

    /// Header comment written at the top of saved INI files.
    fn ini_header(&self) -> Option<String> {
        None
    }

    fn read_setting(&mut self, path: &str) -> Option<SettingValue> {
        self.lookup_setting(path).map(|setting| setting.value())
    }

    /// Canonical string form, as stored in INI files.
    fn read_setting_ini(&mut self, path: &str) -> Option<String> {
        self.lookup_setting(path).map(|setting| setting.ini_string())
    }

    /// Reads `paths`, or every registered path when `None`. Missing paths
    /// are omitted.
    fn read_settings(&mut self, paths: Option<&[String]>) -> BTreeMap<String, SettingValue> {
        let paths = paths.map_or_else(|| self.setting_paths(), <[String]>::to_vec);
        paths
            .into_iter()
            .filter_map(|path| self.read_setting(&path).map(|value| (path, value)))
            .collect()
    }

    fn read_settings_ini(&mut self, paths: Option<&[String]>) -> BTreeMap<String, String> {
        let paths = paths.map_or_else(|| self.setting_paths(), <[String]>::to_vec);
        paths
            .into_iter()
            .filter_map(|path| self.read_setting_ini(&path).map(|value| (path, value)))
            .collect()
    }

    /// Unconditional write; ignores the protected flag.
    fn write_setting(
        &mut self,
        path: &str,
        value: impl Into<SettingValue>,
    ) -> Result<WriteResult, SettingError>
    where
        Self: Sized,
    {
        let Some(setting) = self.lookup_setting(path) else {
            return Ok(WriteResult::PathMissing);
        };
        setting.set_value(value)?;
        self.settings_written();
        Ok(WriteResult::Success)
    }

    /// Write that refuses protected settings.
    fn write_setting_safe(
        &mut self,
        path: &str,
        value: impl Into<SettingValue>,
    ) -> Result<WriteResult, SettingError>
    where
        Self: Sized,
    {
        let Some(setting) = self.lookup_setting(path) else {
            return Ok(WriteResult::PathMissing);
        };
        if setting.is_protected() {
            return Ok(WriteResult::Protected);
        }
        setting.set_value(value)?;
        self.settings_written();
        Ok(WriteResult::Success)
    }

    /// Applies every entry through the safe tier and reports per path.
    fn write_settings_safe(&mut self, settings: &BTreeMap<String, SettingValue>) -> WriteReport
    where
        Self: Sized,
    {
        settings
            .iter()
            .map(|(path, value)| (path.clone(), self.write_setting_safe(path, value.clone())))
            .collect()
    }

    /// Attaches `(label, value)` proposals to each resolvable path without
    /// changing current values. Returns how many settings received one.
    fn propose_settings_values(
        &mut self,
        label: &str,
        settings: &BTreeMap<String, SettingValue>,
    ) -> usize {
        let mut proposed = 0;
        for (path, value) in settings {
            if let Some(setting) = self.lookup_setting(path) {
                setting.propose_value(label, value.clone());
                proposed += 1;
            }
        }
        proposed
    }

    /// Saves every registered setting to `file` and proposes the saved
    /// values under the file name.
    fn settings_save_ini(&mut self, file: &Path) -> Result<BTreeMap<String, String>, IniError> {
        let values = self.read_settings_ini(None);
        let header = self.ini_header();
        ini::save_settings(file, &values, header.as_deref())?;
        self.propose_settings_values(&file_label(file), &as_text_values(&values));
        info!(
            "event=settings_save module=access status=ok entries={} path={}",
            values.len(),
            file.display()
        );
        Ok(values)
    }

    /// Loads `file`, applies it through the safe tier and proposes every
    /// loaded value under the file name.
    fn settings_load_ini(&mut self, file: &Path) -> Result<LoadReport, IniError>
    where
        Self: Sized,
    {
        let values = ini::load_settings(file)?;
        let typed = as_text_values(&values);
        let writes = self.write_settings_safe(&typed);
        self.propose_settings_values(&file_label(file), &typed);

        let report = LoadReport { values, writes };
        info!(
            "event=settings_load module=access status=ok entries={} applied={} path={}",
            report.values.len(),
            report.applied().len(),
            file.display()
        );
        Ok(report)
    }
}

fn file_label(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

fn as_text_values(values: &BTreeMap<String, String>) -> BTreeMap<String, SettingValue> {
    values
        .iter()
        .map(|(path, value)| (path.clone(), SettingValue::Text(value.clone())))
        .collect()
}
