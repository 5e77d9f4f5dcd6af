//! Application scaffolding shared by instrument and browser apps.
//!
//! # Responsibility
//! - Own the app settings collection and the shared path registry.
//! - Own the operation registry.
//! - Resolve setting paths against the flat registry.
//!
//! # Invariants
//! - The app collection is tracked by the registry from construction on.
//! - Every collection passed to `add_collection_to_settings_paths` stays
//!   in sync with the registry through its add/remove events.

mod error;
pub mod overrides;

pub use error::{AppError, AppResult};

use crate::access::SettingAccess;
use crate::operation::OperationRegistry;
use crate::registry::PathRegistry;
use crate::setting::{Setting, SettingsCollection};
use clap::ArgMatches;
use log::info;
use std::cell::RefCell;
use std::rc::Rc;

/// Base application: settings, path registry and operations.
#[derive(Debug)]
pub struct BaseApp {
    name: String,
    settings: SettingsCollection,
    registry: Rc<RefCell<PathRegistry>>,
    operations: OperationRegistry,
}

impl BaseApp {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let settings = SettingsCollection::for_app();
        let registry = Rc::new(RefCell::new(PathRegistry::new()));
        PathRegistry::track(&registry, &settings);
        info!("event=app_init module=app status=ok name={name}");
        Self {
            name,
            settings,
            registry,
            operations: OperationRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The app-level collection (`app/<name>` paths).
    pub fn settings(&self) -> &SettingsCollection {
        &self.settings
    }

    /// Shared registry handle.
    pub fn registry(&self) -> Rc<RefCell<PathRegistry>> {
        Rc::clone(&self.registry)
    }

    /// Registers all settings of `collection` and follows its changes.
    pub fn add_collection_to_settings_paths(&self, collection: &SettingsCollection) {
        PathRegistry::track(&self.registry, collection);
    }

    /// Stops following `collection` and drops its paths from the registry.
    pub fn remove_collection_from_settings_paths(&self, collection: &SettingsCollection) -> bool {
        self.registry.borrow_mut().untrack(collection)
    }

    /// Flat registry lookup.
    pub fn get_setting(&self, path: &str) -> Option<Setting> {
        self.registry.borrow().lookup(path)
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }

    pub fn add_operation(&mut self, name: impl Into<String>, operation: impl FnMut() + 'static) {
        self.operations.add(name, operation);
    }

    pub fn remove_operation(&mut self, name: &str) -> bool {
        self.operations.remove(name)
    }

    /// Runs a registered operation.
    ///
    /// # Errors
    /// - `AppError::UnknownOperation` when `name` is not registered.
    pub fn run_operation(&mut self, name: &str) -> AppResult<()> {
        if self.operations.run(name) {
            Ok(())
        } else {
            Err(AppError::UnknownOperation(name.to_string()))
        }
    }

    /// Applies `--<setting> <value>` overrides from `args` (program name
    /// first). Returns the paths written.
    pub fn apply_cli_overrides<I, T>(&mut self, args: I) -> AppResult<Vec<String>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let settings = self.settings.clone();
        let name = self.name.clone();
        overrides::apply_cli_overrides(self, &name, &settings, args)
    }

    /// Applies overrides from matches built with [`overrides::settings_args`].
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> AppResult<Vec<String>> {
        let settings = self.settings.clone();
        overrides::apply_matches(self, &settings, matches)
    }
}

impl SettingAccess for BaseApp {
    fn lookup_setting(&mut self, path: &str) -> Option<Setting> {
        self.get_setting(path)
    }

    fn setting_paths(&self) -> Vec<String> {
        self.registry.borrow().paths()
    }

    fn ini_header(&self) -> Option<String> {
        Some(format!(
            "{} settings (labframe {})",
            self.name,
            env!("CARGO_PKG_VERSION")
        ))
    }
}
