//! Observable, typed settings and their owning collections.
//!
//! # Responsibility
//! - Define the setting cell (value, protection, proposals, listeners).
//! - Define collections that own settings and announce additions/removals.
//!
//! # Invariants
//! - A setting name is unique within its collection.
//! - A setting path is `<collection path>/<name>` and never changes.
//! - Settings are single-threaded shared handles (`Rc`).

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod collection;
pub mod quantity;
pub mod value;

pub use collection::{CollectionEvent, SettingsCollection};
pub use quantity::{ListenerId, Setting};
pub use value::{SettingKind, SettingValue, ValueError};

static SETTING_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("setting name pattern is valid")
});

/// Declaration of one setting, consumed by [`SettingsCollection::new_setting`].
#[derive(Debug, Clone)]
pub struct SettingBuilder {
    name: String,
    kind: SettingKind,
    initial: Option<SettingValue>,
    description: String,
    protected: bool,
}

impl SettingBuilder {
    pub fn new(name: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            name: name.into(),
            kind,
            initial: None,
            description: String::new(),
            protected: false,
        }
    }

    pub fn initial(mut self, value: impl Into<SettingValue>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }
}

/// Setting declaration and mutation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingError {
    InvalidName(String),
    DuplicateName { collection: String, name: String },
    InvalidValue { path: String, source: ValueError },
    NotAChoice(String),
}

impl Display for SettingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid setting name `{name}`"),
            Self::DuplicateName { collection, name } => {
                write!(f, "setting `{name}` already declared in `{collection}`")
            }
            Self::InvalidValue { path, source } => write!(f, "{path}: {source}"),
            Self::NotAChoice(path) => write!(f, "setting `{path}` is not a choice setting"),
        }
    }
}

impl Error for SettingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { source, .. } => Some(source),
            Self::InvalidName(_) | Self::DuplicateName { .. } | Self::NotAChoice(_) => None,
        }
    }
}

pub(crate) fn validate_setting_name(name: &str) -> Result<(), SettingError> {
    if SETTING_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SettingError::InvalidName(name.to_string()))
    }
}
