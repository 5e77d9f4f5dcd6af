//! Core of the labframe instrument-app framework.
//! Settings registry, INI persistence and data-browser dispatch live here.

pub mod access;
pub mod app;
pub mod browser;
pub mod console;
pub mod ini;
pub mod log_view;
pub mod logging;
pub mod operation;
pub mod registry;
pub mod setting;

pub use access::{LoadReport, SettingAccess, WriteReport, WriteResult};
pub use app::{AppError, AppResult, BaseApp};
pub use browser::{BrowserPlugin, DataBrowser, DataView, FileFilter, FileInfoView};
pub use console::{Console, ConsoleError, ConsoleHost};
pub use ini::IniError;
pub use log_view::HtmlLogView;
pub use logging::{default_log_level, init_logging, log_view, logging_status};
pub use operation::OperationRegistry;
pub use registry::{PathRegistry, SettingPath, SettingSection};
pub use setting::{
    Setting, SettingBuilder, SettingError, SettingKind, SettingValue, SettingsCollection,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
