//! File browser app: interchangeable views and selection-driven plugins.
//!
//! # Responsibility
//! - Track the selected file, the browsed directory and its name filter.
//! - Keep exactly one current view, setting views up lazily.
//! - Auto-select a view for each newly selected file.
//! - Resolve `view/<name>/...` and `plugin/<name>/...` setting paths.
//!
//! # Invariants
//! - A view's `setup` runs at most once.
//! - `file_info` is always registered and is the auto-selection fallback.
//! - Setting listeners only enqueue events; the browser drains the queue
//!   after each write, so handlers never run under a setting borrow.

mod filter;
mod plugin;
mod view;

pub use filter::FileFilter;
pub use plugin::BrowserPlugin;
pub use view::{DataView, FileInfo, FileInfoView, FILE_INFO_VIEW};

use crate::access::SettingAccess;
use crate::app::{AppError, AppResult, BaseApp};
use crate::registry::{SettingPath, SettingSection};
use crate::setting::{
    Setting, SettingBuilder, SettingError, SettingKind, SettingValue, SettingsCollection,
};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const DATA_FILENAME: &str = "data_filename";
pub const BROWSE_DIR: &str = "browse_dir";
pub const FILE_FILTER: &str = "file_filter";
pub const AUTO_SELECT_VIEW: &str = "auto_select_view";
pub const VIEW_NAME: &str = "view_name";
/// Operation that moves the selected file to the OS trash.
pub const RECYCLE_OPERATION: &str = "recycle";

const DEFAULT_APP_NAME: &str = "DataBrowser";
const DEFAULT_FILE_FILTER: &str = "*.*,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowserEvent {
    DataFilename,
    BrowseDir,
    FileFilter,
    ViewName,
    Recycle,
}

struct ViewSlot {
    view: Box<dyn DataView>,
    loaded: bool,
}

struct BrowserSettings {
    data_filename: Setting,
    browse_dir: Setting,
    file_filter: Setting,
    auto_select_view: Setting,
    view_name: Setting,
}

/// Headless data browser built on [`BaseApp`].
pub struct DataBrowser {
    app: BaseApp,
    settings: BrowserSettings,
    views: Vec<ViewSlot>,
    current_view: usize,
    last_dispatch: Option<(usize, PathBuf)>,
    plugins: Vec<Box<dyn BrowserPlugin>>,
    file_filter: FileFilter,
    pending: Rc<RefCell<VecDeque<BrowserEvent>>>,
}

impl DataBrowser {
    pub fn new() -> AppResult<Self> {
        Self::with_name(DEFAULT_APP_NAME)
    }

    /// Creates the browser with its app settings and the `file_info` view,
    /// then points `browse_dir` at the current directory.
    pub fn with_name(name: impl Into<String>) -> AppResult<Self> {
        let app = BaseApp::new(name);
        let settings = declare_settings(app.settings())?;

        let mut browser = Self {
            app,
            settings,
            views: Vec::new(),
            current_view: 0,
            last_dispatch: None,
            plugins: Vec::new(),
            file_filter: FileFilter::parse(DEFAULT_FILE_FILTER),
            pending: Rc::new(RefCell::new(VecDeque::new())),
        };
        browser.add_view(Box::new(FileInfoView::new()))?;
        browser.activate(0);

        for (setting, event) in [
            (&browser.settings.data_filename, BrowserEvent::DataFilename),
            (&browser.settings.browse_dir, BrowserEvent::BrowseDir),
            (&browser.settings.file_filter, BrowserEvent::FileFilter),
            (&browser.settings.view_name, BrowserEvent::ViewName),
        ] {
            let queue = Rc::clone(&browser.pending);
            setting.add_listener(move |_| queue.borrow_mut().push_back(event));
        }

        let queue = Rc::clone(&browser.pending);
        browser.app.add_operation(RECYCLE_OPERATION, move || {
            queue.borrow_mut().push_back(BrowserEvent::Recycle)
        });

        if let Ok(cwd) = std::env::current_dir() {
            browser.settings.browse_dir.set_value(cwd)?;
            browser.process_events();
        }
        Ok(browser)
    }

    /// A detached app collection declaring the browser's settings, for
    /// building command lines before a browser exists.
    pub fn settings_template() -> AppResult<SettingsCollection> {
        let collection = SettingsCollection::for_app();
        declare_settings(&collection)?;
        Ok(collection)
    }

    pub fn app(&self) -> &BaseApp {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut BaseApp {
        &mut self.app
    }

    /// Registers a view. A view with the same name is replaced in place.
    pub fn add_view(&mut self, view: Box<dyn DataView>) -> AppResult<()> {
        let name = view.name().to_string();
        debug!("event=view_add module=browser status=start view={name}");

        match self.view_index(&name) {
            Some(index) => {
                warn!("event=view_add module=browser status=replaced view={name}");
                self.app
                    .remove_collection_from_settings_paths(self.views[index].view.settings());
                self.app.add_collection_to_settings_paths(view.settings());
                self.views[index] = ViewSlot {
                    view,
                    loaded: false,
                };
                if index == self.current_view {
                    self.ensure_loaded(index);
                    self.last_dispatch = None;
                }
            }
            None => {
                self.app.add_collection_to_settings_paths(view.settings());
                self.views.push(ViewSlot {
                    view,
                    loaded: false,
                });
            }
        }

        self.settings.view_name.set_choices(self.view_names())?;
        debug!("event=view_add module=browser status=ok view={name}");
        Ok(())
    }

    /// Registers a plugin and its settings.
    pub fn add_plugin(&mut self, plugin: Box<dyn BrowserPlugin>) {
        info!("event=plugin_add module=browser plugin={}", plugin.name());
        let existing = self
            .plugins
            .iter()
            .position(|existing| existing.name() == plugin.name());
        if let Some(index) = existing {
            self.app
                .remove_collection_from_settings_paths(self.plugins[index].settings());
        }
        self.app.add_collection_to_settings_paths(plugin.settings());
        match existing {
            Some(index) => self.plugins[index] = plugin,
            None => self.plugins.push(plugin),
        }
    }

    /// View names in registration order.
    pub fn view_names(&self) -> Vec<String> {
        self.views
            .iter()
            .map(|slot| slot.view.name().to_string())
            .collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    pub fn view(&self, name: &str) -> Option<&dyn DataView> {
        self.view_index(name).map(|index| self.views[index].view.as_ref())
    }

    pub fn plugin(&self, name: &str) -> Option<&dyn BrowserPlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.name() == name)
            .map(|plugin| plugin.as_ref())
    }

    pub fn current_view(&self) -> &dyn DataView {
        self.views[self.current_view].view.as_ref()
    }

    pub fn current_view_name(&self) -> &str {
        self.views[self.current_view].view.name()
    }

    pub fn is_view_loaded(&self, name: &str) -> bool {
        self.view_index(name)
            .is_some_and(|index| self.views[index].loaded)
    }

    /// Switches the current view through the `view_name` setting.
    ///
    /// # Errors
    /// - `AppError::UnknownView` when no view has that name.
    pub fn set_view(&mut self, name: &str) -> AppResult<()> {
        if self.view_index(name).is_none() {
            return Err(AppError::UnknownView(name.to_string()));
        }
        let path = self.settings.view_name.path().to_string();
        self.write_setting(&path, name)?;
        Ok(())
    }

    /// Selects `path` as the current data file.
    pub fn select_file(&mut self, path: impl AsRef<Path>) -> AppResult<()> {
        let setting_path = self.settings.data_filename.path().to_string();
        self.write_setting(&setting_path, path.as_ref())?;
        Ok(())
    }

    /// Currently selected data file, if any.
    pub fn selected_file(&self) -> Option<PathBuf> {
        match self.settings.data_filename.value() {
            SettingValue::Text(text) if !text.is_empty() => Some(PathBuf::from(text)),
            _ => None,
        }
    }

    pub fn set_browse_dir(&mut self, dir: impl AsRef<Path>) -> AppResult<()> {
        let path = self.settings.browse_dir.path().to_string();
        self.write_setting(&path, dir.as_ref())?;
        Ok(())
    }

    pub fn browse_dir(&self) -> PathBuf {
        PathBuf::from(self.settings.browse_dir.value().to_string())
    }

    pub fn set_file_filter(&mut self, filter: &str) -> AppResult<()> {
        let path = self.settings.file_filter.path().to_string();
        self.write_setting(&path, filter)?;
        Ok(())
    }

    pub fn file_filter(&self) -> &FileFilter {
        &self.file_filter
    }

    /// Entries of `browse_dir` accepted by the current filter.
    pub fn list_files(&self) -> AppResult<Vec<PathBuf>> {
        let dir = self.browse_dir();
        self.file_filter
            .list_dir(&dir)
            .map_err(|source| AppError::Io { path: dir, source })
    }

    /// Name of the last registered view supporting `path`, or `file_info`.
    pub fn auto_select_view(&self, path: &Path) -> String {
        self.views
            .iter()
            .rev()
            .find(|slot| slot.view.is_file_supported(path))
            .map(|slot| slot.view.name().to_string())
            .unwrap_or_else(|| FILE_INFO_VIEW.to_string())
    }

    /// Renames the selected file and selects it under its new name.
    ///
    /// A relative `new_name` is taken relative to the file's directory.
    pub fn rename_data_file(&mut self, new_name: impl AsRef<Path>) -> AppResult<PathBuf> {
        let current = self.require_selected_file()?;
        let new_name = new_name.as_ref();
        let target = if new_name.is_absolute() {
            new_name.to_path_buf()
        } else {
            current
                .parent()
                .map(|parent| parent.join(new_name))
                .unwrap_or_else(|| new_name.to_path_buf())
        };

        std::fs::rename(&current, &target).map_err(|source| AppError::Io {
            path: current.clone(),
            source,
        })?;
        info!(
            "event=file_rename module=browser status=ok from={} to={}",
            current.display(),
            target.display()
        );
        self.select_file(&target)?;
        Ok(target)
    }

    /// Moves the selected file to the OS trash and clears the selection.
    /// Returns the recycled path.
    ///
    /// # Errors
    /// - `AppError::Io` when no file is selected.
    /// - `AppError::Recycle` when the trash rejects the file; the selection
    ///   is kept.
    pub fn recycle_data_file(&mut self) -> AppResult<PathBuf> {
        let current = self.require_selected_file()?;
        trash::delete(&current).map_err(|source| AppError::Recycle {
            path: current.clone(),
            source,
        })?;
        info!(
            "event=file_recycle module=browser status=ok path={}",
            current.display()
        );
        let setting_path = self.settings.data_filename.path().to_string();
        self.write_setting(&setting_path, "")?;
        Ok(current)
    }

    /// Runs an app operation, then handles the events it queued.
    pub fn run_operation(&mut self, name: &str) -> AppResult<()> {
        let result = self.app.run_operation(name);
        self.process_events();
        result
    }

    /// Drains queued setting events.
    pub fn process_events(&mut self) {
        while let Some(event) = self.next_event() {
            match event {
                BrowserEvent::DataFilename => self.on_change_data_filename(),
                BrowserEvent::BrowseDir => self.on_change_browse_dir(),
                BrowserEvent::FileFilter => self.on_change_file_filter(),
                BrowserEvent::ViewName => self.on_change_view_name(),
                BrowserEvent::Recycle => self.on_recycle(),
            }
        }
    }

    fn next_event(&self) -> Option<BrowserEvent> {
        self.pending.borrow_mut().pop_front()
    }

    fn require_selected_file(&self) -> AppResult<PathBuf> {
        self.selected_file().ok_or_else(|| AppError::Io {
            path: PathBuf::new(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no file selected"),
        })
    }

    fn view_index(&self, name: &str) -> Option<usize> {
        self.views.iter().position(|slot| slot.view.name() == name)
    }

    fn ensure_loaded(&mut self, index: usize) {
        let slot = &mut self.views[index];
        if !slot.loaded {
            slot.view.setup();
            slot.loaded = true;
            info!(
                "event=view_setup module=browser status=ok view={}",
                slot.view.name()
            );
        }
    }

    fn activate(&mut self, index: usize) {
        self.ensure_loaded(index);
        self.current_view = index;
    }

    fn dispatch_file(&mut self, index: usize, path: &Path) {
        self.views[index].view.on_change_data_filename(path);
        self.last_dispatch = Some((index, path.to_path_buf()));
    }

    fn on_change_data_filename(&mut self) {
        let Some(path) = self.selected_file() else {
            return;
        };

        if path.is_file() {
            if self.settings.auto_select_view.value().as_bool() == Some(true) {
                let name = self.auto_select_view(&path);
                if name != self.current_view_name() {
                    if let Err(err) = self.settings.view_name.set_value(name.as_str()) {
                        error!("event=view_auto_select module=browser status=error view={name} error={err}");
                    }
                    if let Some(index) = self.view_index(&name) {
                        self.activate(index);
                    }
                }
            }
            debug!(
                "event=data_filename module=browser view={} path={}",
                self.current_view_name(),
                path.display()
            );
            self.dispatch_file(self.current_view, &path);
        } else {
            warn!(
                "event=data_filename module=browser status=invalid path={}",
                path.display()
            );
        }

        for plugin in &mut self.plugins {
            plugin.update_if_showing(&path);
        }
    }

    fn on_change_view_name(&mut self) {
        let name = self.settings.view_name.value().to_string();
        let Some(index) = self.view_index(&name) else {
            warn!("event=view_switch module=browser status=unknown view={name}");
            return;
        };
        self.activate(index);
        info!("event=view_switch module=browser status=ok view={name}");

        if let Some(path) = self.selected_file().filter(|path| path.is_file()) {
            if self.last_dispatch.as_ref() != Some(&(index, path.clone())) {
                self.dispatch_file(index, &path);
            }
        }
    }

    fn on_recycle(&mut self) {
        if let Err(err) = self.recycle_data_file() {
            warn!("event=file_recycle module=browser status=error error={err}");
        }
    }

    fn on_change_browse_dir(&mut self) {
        let dir = self.browse_dir();
        if dir.is_dir() {
            debug!("event=browse_dir module=browser path={}", dir.display());
        } else {
            warn!(
                "event=browse_dir module=browser status=not_a_directory path={}",
                dir.display()
            );
        }
    }

    fn on_change_file_filter(&mut self) {
        let spec = self.settings.file_filter.value().to_string();
        if spec.is_empty() {
            // Re-enters through the queue with "*".
            if let Err(err) = self.settings.file_filter.set_value("*") {
                error!("event=file_filter module=browser status=error error={err}");
            }
            return;
        }
        self.file_filter = FileFilter::parse(&spec);
        debug!(
            "event=file_filter module=browser patterns={:?}",
            self.file_filter.patterns()
        );
    }
}

fn declare_settings(s: &SettingsCollection) -> Result<BrowserSettings, SettingError> {
    Ok(BrowserSettings {
        data_filename: s.new_kind(DATA_FILENAME, SettingKind::File { is_dir: false })?,
        browse_dir: s.new_setting(
            SettingBuilder::new(BROWSE_DIR, SettingKind::File { is_dir: true }).initial("/"),
        )?,
        file_filter: s.new_setting(
            SettingBuilder::new(FILE_FILTER, SettingKind::Text).initial(DEFAULT_FILE_FILTER),
        )?,
        auto_select_view: s.new_setting(
            SettingBuilder::new(AUTO_SELECT_VIEW, SettingKind::Bool)
                .initial(true)
                .description("auto selects the view when file name is changed."),
        )?,
        view_name: s.new_setting(
            SettingBuilder::new(VIEW_NAME, SettingKind::Choice(vec![FILE_INFO_VIEW.to_string()]))
                .initial(FILE_INFO_VIEW),
        )?,
    })
}

impl SettingAccess for DataBrowser {
    /// Resolves `view/<name>/<setting>` (setting the view up on first
    /// access), `plugin/<name>/<setting>`, then app settings by bare name
    /// or `app/<name>`, then any other tracked collection.
    fn lookup_setting(&mut self, path: &str) -> Option<Setting> {
        let parsed = SettingPath::parse(path);
        match (parsed.section, parsed.owner) {
            (SettingSection::View, Some(owner)) => {
                if let Some(index) = self.view_index(owner) {
                    self.ensure_loaded(index);
                    return self.views[index].view.settings().get_by_path(parsed.suffix);
                }
            }
            (SettingSection::Plugin, Some(owner)) => {
                if let Some(plugin) = self.plugins.iter().find(|plugin| plugin.name() == owner) {
                    return plugin.settings().get_by_path(parsed.suffix);
                }
            }
            _ => {}
        }

        self.app
            .settings()
            .get_by_path(path)
            .or_else(|| self.app.get_setting(path))
    }

    fn setting_paths(&self) -> Vec<String> {
        self.app.setting_paths()
    }

    fn settings_written(&mut self) {
        self.process_events();
    }

    fn ini_header(&self) -> Option<String> {
        self.app.ini_header()
    }
}
