//! Flat path registry over every tracked settings collection.
//!
//! # Responsibility
//! - Map fully-qualified path strings to settings across app, views and
//!   plugins.
//! - Follow collection add/remove events without polling.
//!
//! # Invariants
//! - At most one setting per path; a later registration overwrites.
//! - Unregistering an unknown path is a no-op.
//! - Lookups never fail loudly; a missing path is `None`.

use crate::setting::{CollectionEvent, Setting, SettingsCollection};
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Top-level namespace of a setting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSection {
    App,
    View,
    Plugin,
}

impl SettingSection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::View => "view",
            Self::Plugin => "plugin",
        }
    }
}

/// Parsed form of a path string.
///
/// `view/<owner>/<suffix>` and `plugin/<owner>/<suffix>` name an owned
/// sub-container; anything else addresses the app collection as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingPath<'a> {
    pub section: SettingSection,
    pub owner: Option<&'a str>,
    pub suffix: &'a str,
}

impl<'a> SettingPath<'a> {
    pub fn parse(path: &'a str) -> Self {
        let owned = |section: SettingSection, rest: &'a str| match rest.split_once('/') {
            Some((owner, suffix)) if !owner.is_empty() => Some(SettingPath {
                section,
                owner: Some(owner),
                suffix,
            }),
            _ => None,
        };

        let parsed = match path.split_once('/') {
            Some(("view", rest)) => owned(SettingSection::View, rest),
            Some(("plugin", rest)) => owned(SettingSection::Plugin, rest),
            _ => None,
        };
        parsed.unwrap_or(SettingPath {
            section: SettingSection::App,
            owner: None,
            suffix: path,
        })
    }
}

/// Path-to-setting map shared by an app and its views/plugins.
#[derive(Debug, Default)]
pub struct PathRegistry {
    paths: BTreeMap<String, Setting>,
    tracked: Vec<(u64, SettingsCollection)>,
    next_token: u64,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the mapping for `path`.
    pub fn register(&mut self, path: impl Into<String>, setting: Setting) {
        let path = path.into();
        if self.paths.insert(path.clone(), setting).is_some() {
            debug!("event=setting_path_overwrite module=registry path={path}");
        }
    }

    /// Removes `path` if present.
    pub fn unregister(&mut self, path: &str) -> Option<Setting> {
        self.paths.remove(path)
    }

    /// Removes `setting.path()` only while it still maps to `setting`.
    pub fn unregister_setting(&mut self, setting: &Setting) -> bool {
        match self.paths.get(setting.path()) {
            Some(current) if current.ptr_eq(setting) => {
                self.paths.remove(setting.path());
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, path: &str) -> Option<Setting> {
        self.paths.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.paths.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Registers every setting of `collection` and follows its changes.
    ///
    /// The subscription holds the registry weakly; once the registry is
    /// dropped, or the collection is untracked, events are ignored.
    /// Tracking an already tracked collection only re-registers its paths.
    pub fn track(registry: &Rc<RefCell<PathRegistry>>, collection: &SettingsCollection) {
        let token = {
            let mut paths = registry.borrow_mut();
            for setting in collection.settings() {
                paths.register(setting.path().to_string(), setting);
            }
            if paths.is_tracking(collection) {
                return;
            }
            let token = paths.next_token;
            paths.next_token += 1;
            paths.tracked.push((token, collection.clone()));
            token
        };

        let weak: Weak<RefCell<PathRegistry>> = Rc::downgrade(registry);
        collection.subscribe(move |event| {
            let Some(registry) = weak.upgrade() else {
                return;
            };
            let mut registry = registry.borrow_mut();
            if !registry.tracked.iter().any(|(active, _)| *active == token) {
                return;
            }
            match event {
                CollectionEvent::Added(setting) => {
                    registry.register(setting.path().to_string(), setting.clone());
                }
                CollectionEvent::Removed(setting) => {
                    registry.unregister_setting(setting);
                }
            }
        });
        debug!(
            "event=collection_tracked module=registry collection={} settings={}",
            collection.path(),
            collection.len()
        );
    }

    /// Stops following `collection` and unregisters the paths that still
    /// map to its settings. Returns `false` if it was not tracked.
    pub fn untrack(&mut self, collection: &SettingsCollection) -> bool {
        let before = self.tracked.len();
        self.tracked
            .retain(|(_, tracked)| !tracked.ptr_eq(collection));
        if self.tracked.len() == before {
            return false;
        }
        for setting in collection.settings() {
            self.unregister_setting(&setting);
        }
        debug!(
            "event=collection_untracked module=registry collection={}",
            collection.path()
        );
        true
    }

    pub fn is_tracking(&self, collection: &SettingsCollection) -> bool {
        self.tracked
            .iter()
            .any(|(_, tracked)| tracked.ptr_eq(collection))
    }
}
