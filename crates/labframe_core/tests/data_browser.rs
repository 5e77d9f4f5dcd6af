use labframe_core::app::overrides;
use labframe_core::browser::{FILE_INFO_VIEW, RECYCLE_OPERATION, VIEW_NAME};
use labframe_core::{
    AppError, BrowserPlugin, DataBrowser, DataView, SettingAccess, SettingKind, SettingValue,
    SettingsCollection, WriteResult,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

struct NamedView {
    name: &'static str,
    settings: SettingsCollection,
}

impl NamedView {
    fn boxed(name: &'static str, setting: &str) -> Box<dyn DataView> {
        let settings = SettingsCollection::for_view(name);
        settings.new_kind(setting, SettingKind::Float).unwrap();
        Box::new(Self { name, settings })
    }
}

impl DataView for NamedView {
    fn name(&self) -> &str {
        self.name
    }

    fn settings(&self) -> &SettingsCollection {
        &self.settings
    }

    fn on_change_data_filename(&mut self, _path: &Path) {}
}

type Journal = Rc<RefCell<Vec<String>>>;

struct ExtensionView {
    name: String,
    extension: &'static str,
    settings: SettingsCollection,
    journal: Journal,
}

impl ExtensionView {
    fn boxed(name: &str, extension: &'static str, journal: &Journal) -> Box<dyn DataView> {
        let settings = SettingsCollection::for_view(name);
        settings.new_kind("threshold", SettingKind::Float).unwrap();
        Box::new(Self {
            name: name.to_string(),
            extension,
            settings,
            journal: Rc::clone(journal),
        })
    }
}

impl DataView for ExtensionView {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &SettingsCollection {
        &self.settings
    }

    fn setup(&mut self) {
        self.journal.borrow_mut().push(format!("setup:{}", self.name));
    }

    fn is_file_supported(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension)
    }

    fn on_change_data_filename(&mut self, path: &Path) {
        let file = path.file_name().unwrap().to_string_lossy();
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.name, file));
    }
}

struct RecordingPlugin {
    settings: SettingsCollection,
    showing: Rc<Cell<bool>>,
    seen: Rc<RefCell<Vec<PathBuf>>>,
}

impl BrowserPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recorder"
    }

    fn settings(&self) -> &SettingsCollection {
        &self.settings
    }

    fn is_showing(&self) -> bool {
        self.showing.get()
    }

    fn update(&mut self, data_filename: &Path) {
        self.seen.borrow_mut().push(data_filename.to_path_buf());
    }
}

fn browser_with_views(journal: &Journal) -> DataBrowser {
    let mut browser = DataBrowser::new().unwrap();
    for name in ["A", "B", "C"] {
        browser
            .add_view(ExtensionView::boxed(name, "dat", journal))
            .unwrap();
    }
    browser
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"0123456789").unwrap();
    path
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

#[test]
fn starts_on_file_info_with_builtin_settings() {
    let browser = DataBrowser::new().unwrap();
    assert_eq!(browser.current_view_name(), FILE_INFO_VIEW);
    assert!(browser.is_view_loaded(FILE_INFO_VIEW));

    let paths = browser.setting_paths();
    for path in [
        "app/auto_select_view",
        "app/browse_dir",
        "app/data_filename",
        "app/file_filter",
        "app/view_name",
        "view/file_info/human_readable_size",
    ] {
        assert!(paths.contains(&path.to_string()), "missing {path}");
    }
    assert_eq!(
        browser.browse_dir(),
        std::env::current_dir().unwrap()
    );
}

#[test]
fn auto_select_prefers_last_registered_view() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "x.dat");
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);

    assert_eq!(browser.auto_select_view(&file), "C");
    assert_eq!(browser.auto_select_view(Path::new("x.txt")), FILE_INFO_VIEW);

    browser.select_file(&file).unwrap();
    assert_eq!(browser.current_view_name(), "C");
    assert_eq!(entries(&journal), vec!["setup:C", "C:x.dat"]);
    assert_eq!(
        browser.read_setting_ini(&format!("app/{VIEW_NAME}")).as_deref(),
        Some("C")
    );
}

#[test]
fn unsupported_file_falls_back_to_file_info() {
    let dir = tempfile::tempdir().unwrap();
    let dat = touch(dir.path(), "x.dat");
    let txt = touch(dir.path(), "notes.txt");
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);

    browser.select_file(&dat).unwrap();
    browser.select_file(&txt).unwrap();
    assert_eq!(browser.current_view_name(), FILE_INFO_VIEW);
    let status = browser.current_view().status().unwrap();
    assert!(status.contains("notes.txt"));
}

#[test]
fn view_setup_runs_once_even_when_reached_by_path() {
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);
    assert!(!browser.is_view_loaded("B"));

    assert_eq!(
        browser.read_setting("view/B/threshold"),
        Some(SettingValue::Float(0.0))
    );
    assert!(browser.is_view_loaded("B"));
    assert_eq!(browser.current_view_name(), FILE_INFO_VIEW);

    assert_eq!(
        browser.write_setting("view/B/threshold", 0.5).unwrap(),
        WriteResult::Success
    );
    browser.set_view("B").unwrap();
    browser.set_view(FILE_INFO_VIEW).unwrap();
    browser.set_view("B").unwrap();
    assert_eq!(entries(&journal), vec!["setup:B"]);
}

#[test]
fn switching_views_dispatches_selected_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "x.dat");
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);
    browser.write_setting("app/auto_select_view", false).unwrap();

    browser.select_file(&file).unwrap();
    assert_eq!(browser.current_view_name(), FILE_INFO_VIEW);
    assert!(entries(&journal).is_empty());

    browser.set_view("B").unwrap();
    browser.set_view("B").unwrap();
    browser.set_view("A").unwrap();
    browser.set_view("B").unwrap();
    assert_eq!(
        entries(&journal),
        vec!["setup:B", "B:x.dat", "setup:A", "A:x.dat", "B:x.dat"]
    );

    let err = browser.set_view("nope").unwrap_err();
    assert!(matches!(err, AppError::UnknownView(_)));
}

#[test]
fn plugins_follow_every_selection_while_showing() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "x.dat");
    let showing = Rc::new(Cell::new(true));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut browser = DataBrowser::new().unwrap();
    browser.add_plugin(Box::new(RecordingPlugin {
        settings: SettingsCollection::for_plugin("recorder"),
        showing: Rc::clone(&showing),
        seen: Rc::clone(&seen),
    }));

    browser.select_file(&file).unwrap();
    let missing = dir.path().join("gone.dat");
    browser.select_file(&missing).unwrap();
    assert_eq!(*seen.borrow(), vec![file.clone(), missing]);

    showing.set(false);
    browser.select_file(dir.path().join("other.dat")).unwrap();
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(browser.plugin_names(), vec!["recorder"]);
}

#[test]
fn plugin_and_view_paths_resolve_through_the_browser() {
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);
    let settings = SettingsCollection::for_plugin("recorder");
    let bins = settings.new_kind("bins", SettingKind::Int).unwrap();
    browser.add_plugin(Box::new(RecordingPlugin {
        settings,
        showing: Rc::new(Cell::new(true)),
        seen: Rc::default(),
    }));

    assert_eq!(
        browser.write_setting_safe("plugin/recorder/bins", 64).unwrap(),
        WriteResult::Success
    );
    assert_eq!(bins.value(), SettingValue::Int(64));
    assert!(browser
        .setting_paths()
        .contains(&"plugin/recorder/bins".to_string()));

    assert_eq!(browser.read_setting("view/nope/threshold"), None);
    assert_eq!(
        browser.write_setting("view/nope/threshold", 1).unwrap(),
        WriteResult::PathMissing
    );
    assert_eq!(browser.read_setting("plugin/nope/bins"), None);
    assert!(browser.read_setting("file_filter").is_some());
}

#[test]
fn empty_file_filter_means_everything() {
    let mut browser = DataBrowser::new().unwrap();
    browser.set_file_filter("").unwrap();
    assert_eq!(browser.file_filter().patterns(), ["*".to_string()]);
    assert_eq!(
        browser.read_setting_ini("app/file_filter").as_deref(),
        Some("*")
    );
}

#[test]
fn listing_keeps_directories_and_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a.csv");
    touch(dir.path(), "B.CSV");
    touch(dir.path(), "notes.txt");
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let mut browser = DataBrowser::new().unwrap();
    browser.set_browse_dir(dir.path()).unwrap();
    browser.set_file_filter("*.csv, *.h5").unwrap();

    let names: Vec<String> = browser
        .list_files()
        .unwrap()
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["B.CSV", "a.csv", "sub"]);
}

#[test]
fn rename_moves_file_and_reselects_it() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "run1.dat");
    let mut browser = DataBrowser::new().unwrap();
    browser.select_file(&file).unwrap();

    let renamed = browser.rename_data_file("run1_good.dat").unwrap();
    assert_eq!(renamed, dir.path().join("run1_good.dat"));
    assert!(!file.exists());
    assert!(renamed.is_file());
    assert_eq!(browser.selected_file(), Some(renamed));
}

#[test]
fn command_line_overrides_reach_browser_settings() {
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);
    let app_settings = browser.app().settings().clone();

    let applied = overrides::apply_cli_overrides(
        &mut browser,
        "browser",
        &app_settings,
        ["browser", "--view_name", "A", "--auto_select_view", "off"],
    )
    .unwrap();
    assert_eq!(applied, vec!["app/auto_select_view", "app/view_name"]);
    assert_eq!(browser.current_view_name(), "A");
    assert_eq!(
        browser.read_setting("app/auto_select_view"),
        Some(SettingValue::Bool(false))
    );

    let err = overrides::apply_cli_overrides(
        &mut browser,
        "browser",
        &app_settings,
        ["browser", "--view_name", "missing"],
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Setting(_)));
}

fn recorder_with(setting: &str) -> (Box<dyn BrowserPlugin>, SettingsCollection) {
    let settings = SettingsCollection::for_plugin("recorder");
    settings.new_kind(setting, SettingKind::Int).unwrap();
    let plugin = Box::new(RecordingPlugin {
        settings: settings.clone(),
        showing: Rc::new(Cell::new(true)),
        seen: Rc::default(),
    });
    (plugin, settings)
}

#[test]
fn replacing_a_view_drops_the_old_view_paths() {
    let mut browser = DataBrowser::new().unwrap();
    browser.add_view(NamedView::boxed("image", "gamma")).unwrap();
    assert!(browser.app().get_setting("view/image/gamma").is_some());

    browser.add_view(NamedView::boxed("image", "contrast")).unwrap();
    let paths = browser.setting_paths();
    assert!(paths.contains(&"view/image/contrast".to_string()));
    assert!(!paths.contains(&"view/image/gamma".to_string()));
    assert!(browser.app().get_setting("view/image/gamma").is_none());
    assert_eq!(browser.read_setting("view/image/gamma"), None);
    let names = browser.view_names();
    assert_eq!(names.iter().filter(|name| name.as_str() == "image").count(), 1);
}

#[test]
fn replacing_a_plugin_drops_the_old_plugin_paths() {
    let mut browser = DataBrowser::new().unwrap();
    let (first, old_settings) = recorder_with("bins");
    browser.add_plugin(first);
    let (second, _) = recorder_with("range");
    browser.add_plugin(second);

    let paths = browser.setting_paths();
    assert!(paths.contains(&"plugin/recorder/range".to_string()));
    assert!(!paths.contains(&"plugin/recorder/bins".to_string()));
    assert!(browser.app().get_setting("plugin/recorder/bins").is_none());

    // The replaced collection no longer feeds the registry.
    old_settings.new_kind("extra", SettingKind::Bool).unwrap();
    assert!(browser.app().get_setting("plugin/recorder/extra").is_none());
    assert_eq!(browser.plugin_names(), vec!["recorder"]);
}

#[test]
fn view_and_plugin_sections_survive_an_ini_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("browser.ini");
    let journal = Journal::default();
    let mut browser = browser_with_views(&journal);
    let (plugin, _) = recorder_with("bins");
    browser.add_plugin(plugin);

    browser.write_setting("view/B/threshold", 0.75).unwrap();
    browser.write_setting("plugin/recorder/bins", 32).unwrap();
    browser.set_view("A").unwrap();
    let before = browser.read_settings(None);

    browser.settings_save_ini(&file).unwrap();
    let text = std::fs::read_to_string(&file).unwrap();
    assert!(text.contains("[view/B]\n"));
    assert!(text.contains("[plugin/recorder]\n"));
    assert!(text.contains("bins = 32\n"));

    browser.write_setting("view/B/threshold", 2.0).unwrap();
    browser.write_setting("plugin/recorder/bins", 1).unwrap();
    browser.set_file_filter("*.h5").unwrap();
    browser.set_view("B").unwrap();
    assert_ne!(browser.read_settings(None), before);

    let report = browser.settings_load_ini(&file).unwrap();
    assert_eq!(report.writes["view/B/threshold"], Ok(WriteResult::Success));
    assert_eq!(report.writes["plugin/recorder/bins"], Ok(WriteResult::Success));
    assert_eq!(browser.read_settings(None), before);
    assert_eq!(browser.current_view_name(), "A");
}

#[test]
fn recycle_without_selection_is_an_error() {
    let mut browser = DataBrowser::new().unwrap();
    let err = browser.recycle_data_file().unwrap_err();
    assert!(matches!(err, AppError::Io { .. }));
}

#[test]
fn recycle_clears_the_selection_or_keeps_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "run1.dat");
    let mut browser = DataBrowser::new().unwrap();
    browser.select_file(&file).unwrap();

    // Headless hosts may have no trash to move files into.
    match browser.recycle_data_file() {
        Ok(recycled) => {
            assert_eq!(recycled, file);
            assert!(!file.exists());
            assert_eq!(browser.selected_file(), None);
        }
        Err(AppError::Recycle { path, .. }) => {
            assert_eq!(path, file);
            assert!(file.exists());
            assert_eq!(browser.selected_file(), Some(file));
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn recycle_is_registered_as_an_operation() {
    let mut browser = DataBrowser::new().unwrap();
    assert!(browser
        .app()
        .operations()
        .names()
        .contains(&RECYCLE_OPERATION.to_string()));

    // Nothing selected: the operation runs and the failure is only logged.
    browser.run_operation(RECYCLE_OPERATION).unwrap();
    assert_eq!(browser.selected_file(), None);
}
