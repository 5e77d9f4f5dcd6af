//! Ordered, owned set of settings with add/remove notifications.

use super::quantity::Setting;
use super::value::SettingKind;
use super::{validate_setting_name, SettingBuilder, SettingError};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Collection change emitted to subscribers.
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    Added(Setting),
    Removed(Setting),
}

type Subscriber = Rc<dyn Fn(&CollectionEvent)>;

struct CollectionInner {
    path: String,
    settings: RefCell<Vec<Setting>>,
    subscribers: RefCell<Vec<Subscriber>>,
}

/// Shared handle to one app/view/plugin settings collection.
#[derive(Clone)]
pub struct SettingsCollection {
    inner: Rc<CollectionInner>,
}

impl Debug for SettingsCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCollection")
            .field("path", &self.inner.path)
            .field("names", &self.names())
            .finish()
    }
}

impl SettingsCollection {
    /// Creates an empty collection whose settings live under `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                path: path.into(),
                settings: RefCell::new(Vec::new()),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Collection owned by the application itself (`app/<name>`).
    pub fn for_app() -> Self {
        Self::new("app")
    }

    /// Collection owned by a view (`view/<view>/<name>`).
    pub fn for_view(view_name: &str) -> Self {
        Self::new(format!("view/{view_name}"))
    }

    /// Collection owned by a plugin (`plugin/<plugin>/<name>`).
    pub fn for_plugin(plugin_name: &str) -> Self {
        Self::new(format!("plugin/{plugin_name}"))
    }

    /// Whether both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &SettingsCollection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Declares a new setting and notifies subscribers.
    ///
    /// # Errors
    /// - `InvalidName` when the name is empty or contains separators.
    /// - `DuplicateName` when the collection already owns that name.
    /// - `InvalidValue` when the initial value does not fit the kind.
    pub fn new_setting(&self, builder: SettingBuilder) -> Result<Setting, SettingError> {
        validate_setting_name(&builder.name)?;
        if self.contains(&builder.name) {
            return Err(SettingError::DuplicateName {
                collection: self.inner.path.clone(),
                name: builder.name,
            });
        }

        let path = format!("{}/{}", self.inner.path, builder.name);
        let value = match builder.initial {
            Some(initial) => builder
                .kind
                .coerce(initial)
                .map_err(|source| SettingError::InvalidValue {
                    path: path.clone(),
                    source,
                })?,
            None => builder.kind.default_value(),
        };

        let setting = Setting::new(
            builder.name,
            path,
            builder.description,
            builder.kind,
            value,
            builder.protected,
        );
        self.inner.settings.borrow_mut().push(setting.clone());
        self.emit(&CollectionEvent::Added(setting.clone()));
        Ok(setting)
    }

    /// Shorthand for `new_setting(SettingBuilder::new(name, kind))`.
    pub fn new_kind(
        &self,
        name: impl Into<String>,
        kind: SettingKind,
    ) -> Result<Setting, SettingError> {
        self.new_setting(SettingBuilder::new(name, kind))
    }

    pub fn get(&self, name: &str) -> Option<Setting> {
        self.inner
            .settings
            .borrow()
            .iter()
            .find(|setting| setting.name() == name)
            .cloned()
    }

    /// Looks up by bare name or by `<collection path>/<name>`.
    pub fn get_by_path(&self, path: &str) -> Option<Setting> {
        let name = path
            .strip_prefix(self.inner.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path);
        self.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a setting and notifies subscribers.
    pub fn remove(&self, name: &str) -> Option<Setting> {
        let removed = {
            let mut settings = self.inner.settings.borrow_mut();
            let index = settings.iter().position(|setting| setting.name() == name)?;
            settings.remove(index)
        };
        self.emit(&CollectionEvent::Removed(removed.clone()));
        Some(removed)
    }

    /// Settings in declaration order.
    pub fn settings(&self) -> Vec<Setting> {
        self.inner.settings.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner
            .settings
            .borrow()
            .iter()
            .map(|setting| setting.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.settings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.settings.borrow().is_empty()
    }

    /// Subscribes to add/remove events. Existing settings are not replayed.
    pub fn subscribe(&self, subscriber: impl Fn(&CollectionEvent) + 'static) {
        self.inner
            .subscribers
            .borrow_mut()
            .push(Rc::new(subscriber));
    }

    fn emit(&self, event: &CollectionEvent) {
        let subscribers = self.inner.subscribers.borrow().clone();
        for subscriber in subscribers {
            subscriber(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionEvent, SettingsCollection};
    use crate::setting::{SettingBuilder, SettingError, SettingKind, SettingValue};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn paths_follow_collection_prefix() {
        let collection = SettingsCollection::for_view("image");
        let setting = collection
            .new_kind("gamma", SettingKind::Float)
            .expect("new setting");
        assert_eq!(setting.path(), "view/image/gamma");
        assert!(collection.get_by_path("view/image/gamma").is_some());
        assert!(collection.get_by_path("gamma").is_some());
        assert!(collection.get_by_path("view/other/gamma").is_none());
    }

    #[test]
    fn rejects_duplicate_and_invalid_names() {
        let collection = SettingsCollection::for_app();
        collection
            .new_kind("dup", SettingKind::Bool)
            .expect("first declaration");

        let err = collection
            .new_kind("dup", SettingKind::Bool)
            .expect_err("duplicate must fail");
        assert!(matches!(err, SettingError::DuplicateName { .. }));

        for bad in ["", "a/b", "has space", "9lives", "k=v"] {
            let err = collection
                .new_kind(bad, SettingKind::Text)
                .expect_err("invalid name must fail");
            assert!(matches!(err, SettingError::InvalidName(_)), "{bad}");
        }
    }

    #[test]
    fn rejects_initial_value_of_wrong_kind() {
        let collection = SettingsCollection::for_app();
        let err = collection
            .new_setting(SettingBuilder::new("n", SettingKind::Int).initial("x"))
            .expect_err("text initial for int");
        assert!(matches!(err, SettingError::InvalidValue { .. }));
        assert!(collection.is_empty());
    }

    #[test]
    fn emits_add_and_remove_events() {
        let collection = SettingsCollection::for_app();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        collection.subscribe(move |event| {
            let entry = match event {
                CollectionEvent::Added(s) => format!("+{}", s.path()),
                CollectionEvent::Removed(s) => format!("-{}", s.path()),
            };
            sink.borrow_mut().push(entry);
        });

        collection
            .new_setting(SettingBuilder::new("flag", SettingKind::Bool).initial(true))
            .expect("new setting");
        assert_eq!(
            collection.get("flag").map(|s| s.value()),
            Some(SettingValue::Bool(true))
        );
        assert!(collection.remove("flag").is_some());
        assert!(collection.remove("flag").is_none());

        assert_eq!(*log.borrow(), vec!["+app/flag", "-app/flag"]);
    }
}
