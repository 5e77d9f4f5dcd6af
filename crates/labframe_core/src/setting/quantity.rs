//! Observable setting cell.
//!
//! # Responsibility
//! - Hold one typed value plus its protection flag and proposal history.
//! - Notify listeners synchronously when the value changes.
//!
//! # Invariants
//! - The stored value always satisfies the declared kind.
//! - Listeners run in registration order, only when the value changed.
//! - No internal borrow is held while listeners run, so a listener may
//!   write the same setting again.

use super::value::{SettingKind, SettingValue, ValueError};
use super::SettingError;
use log::debug;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Handle returned by [`Setting::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&SettingValue)>;

struct SettingState {
    kind: SettingKind,
    value: SettingValue,
    protected: bool,
    proposed: Vec<(String, SettingValue)>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
}

struct SettingInner {
    name: String,
    path: String,
    description: String,
    state: RefCell<SettingState>,
}

/// Shared handle to one setting. Clones refer to the same cell.
#[derive(Clone)]
pub struct Setting {
    inner: Rc<SettingInner>,
}

impl Debug for Setting {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Setting")
            .field("path", &self.inner.path)
            .field("kind", &state.kind)
            .field("value", &state.value)
            .field("protected", &state.protected)
            .finish()
    }
}

impl Setting {
    pub(crate) fn new(
        name: String,
        path: String,
        description: String,
        kind: SettingKind,
        value: SettingValue,
        protected: bool,
    ) -> Self {
        Self {
            inner: Rc::new(SettingInner {
                name,
                path,
                description,
                state: RefCell::new(SettingState {
                    kind,
                    value,
                    protected,
                    proposed: Vec::new(),
                    listeners: Vec::new(),
                    next_listener_id: 0,
                }),
            }),
        }
    }

    /// Short name, unique within the owning collection.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fully-qualified path, e.g. `view/file_info/show_hidden`.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn kind(&self) -> SettingKind {
        self.inner.state.borrow().kind.clone()
    }

    pub fn value(&self) -> SettingValue {
        self.inner.state.borrow().value.clone()
    }

    /// Canonical string form; `kind().parse_ini` accepts it unchanged.
    pub fn ini_string(&self) -> String {
        let state = self.inner.state.borrow();
        state.kind.ini_string(&state.value)
    }

    /// Sets a new value after coercing it to the declared kind.
    ///
    /// Returns `Ok(true)` when the value changed and listeners were notified.
    ///
    /// # Errors
    /// - `SettingError::InvalidValue` when the value does not fit the kind;
    ///   the stored value is left untouched.
    pub fn set_value(&self, value: impl Into<SettingValue>) -> Result<bool, SettingError> {
        let listeners = {
            let mut state = self.inner.state.borrow_mut();
            let coerced = state
                .kind
                .coerce(value.into())
                .map_err(|source| self.invalid(source))?;
            if coerced == state.value {
                return Ok(false);
            }
            state.value = coerced;
            state
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect::<Vec<_>>()
        };

        let current = self.value();
        debug!(
            "event=setting_changed module=setting path={} value={}",
            self.inner.path, current
        );
        for listener in listeners {
            listener(&current);
        }
        Ok(true)
    }

    /// Registers a change listener.
    pub fn add_listener(&self, listener: impl Fn(&SettingValue) + 'static) -> ListenerId {
        let mut state = self.inner.state.borrow_mut();
        let id = ListenerId(state.next_listener_id);
        state.next_listener_id += 1;
        state.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    pub fn is_protected(&self) -> bool {
        self.inner.state.borrow().protected
    }

    /// Protected settings refuse writes made through the safe tier only.
    pub fn set_protected(&self, protected: bool) {
        self.inner.state.borrow_mut().protected = protected;
    }

    /// Records a candidate value under `label` without applying it.
    ///
    /// The value is stored coerced when it fits the kind and raw otherwise,
    /// so proposals from stale or foreign files remain inspectable.
    pub fn propose_value(&self, label: impl Into<String>, value: impl Into<SettingValue>) {
        let label = label.into();
        let mut state = self.inner.state.borrow_mut();
        let raw = value.into();
        let value = state.kind.coerce(raw.clone()).unwrap_or(raw);
        state.proposed.retain(|(existing, _)| existing != &label);
        state.proposed.push((label, value));
    }

    /// Proposal history, oldest label first.
    pub fn proposed_values(&self) -> Vec<(String, SettingValue)> {
        self.inner.state.borrow().proposed.clone()
    }

    /// Replaces the list of a `Choice` setting.
    ///
    /// The current value is kept even when it is no longer listed.
    ///
    /// # Errors
    /// - `SettingError::NotAChoice` for other kinds.
    pub fn set_choices(&self, choices: Vec<String>) -> Result<(), SettingError> {
        let mut state = self.inner.state.borrow_mut();
        match &mut state.kind {
            SettingKind::Choice(existing) => {
                *existing = choices;
                Ok(())
            }
            _ => Err(SettingError::NotAChoice(self.inner.path.clone())),
        }
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Setting) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn invalid(&self, source: ValueError) -> SettingError {
        SettingError::InvalidValue {
            path: self.inner.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Setting;
    use crate::setting::{SettingError, SettingKind, SettingValue};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn int_setting(value: i64) -> Setting {
        Setting::new(
            "count".to_string(),
            "app/count".to_string(),
            String::new(),
            SettingKind::Int,
            SettingValue::Int(value),
            false,
        )
    }

    #[test]
    fn listeners_fire_in_order_only_on_change() {
        let setting = int_setting(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            setting.add_listener(move |value| seen.borrow_mut().push(format!("{tag}:{value}")));
        }

        assert!(setting.set_value(2).expect("int write"));
        assert!(!setting.set_value(2).expect("same value"));

        assert_eq!(*seen.borrow(), vec!["first:2", "second:2"]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let setting = int_setting(1);
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = setting.add_listener(move |_| *counter.borrow_mut() += 1);

        assert!(setting.remove_listener(id));
        assert!(!setting.remove_listener(id));
        setting.set_value(5).expect("int write");
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn listener_may_write_the_same_setting() {
        let setting = int_setting(0);
        let handle = setting.clone();
        setting.add_listener(move |value| {
            if value.as_int().is_some_and(|v| v < 3) {
                let next = value.as_int().unwrap_or_default() + 1;
                handle.set_value(next).expect("nested write");
            }
        });

        setting.set_value(1).expect("int write");
        assert_eq!(setting.value(), SettingValue::Int(3));
    }

    #[test]
    fn invalid_value_leaves_setting_untouched() {
        let setting = int_setting(4);
        let err = setting.set_value("four").expect_err("text is not an int");
        assert!(matches!(err, SettingError::InvalidValue { .. }));
        assert_eq!(setting.value(), SettingValue::Int(4));
    }

    #[test]
    fn proposal_relabel_moves_to_end() {
        let setting = int_setting(10);
        setting.propose_value("a.ini", "5");
        setting.propose_value("b.ini", 6);
        setting.propose_value("a.ini", "not a number");

        assert_eq!(
            setting.proposed_values(),
            vec![
                ("b.ini".to_string(), SettingValue::Int(6)),
                (
                    "a.ini".to_string(),
                    SettingValue::Text("not a number".to_string())
                ),
            ]
        );
        assert_eq!(setting.value(), SettingValue::Int(10));
    }
}
