//! Setting kinds, values and the canonical INI string form.
//!
//! # Responsibility
//! - Declare the primitive kinds a setting may hold.
//! - Coerce incoming values (typed or textual) into a kind.
//!
//! # Invariants
//! - `SettingKind::parse_ini(kind.ini_string(v)) == v` for every value `v`
//!   accepted by `kind`.
//! - Coercion never panics; rejected input yields `ValueError`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declared type of one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Int,
    Float,
    Text,
    /// File system path; `is_dir` marks directory pickers.
    File { is_dir: bool },
    /// Enumerated text choice.
    Choice(Vec<String>),
}

/// Current or proposed value of one setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl Display for SettingValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&std::path::Path> for SettingValue {
    fn from(value: &std::path::Path) -> Self {
        Self::Text(value.to_string_lossy().into_owned())
    }
}

impl From<std::path::PathBuf> for SettingValue {
    fn from(value: std::path::PathBuf) -> Self {
        Self::from(value.as_path())
    }
}

/// Value rejected by a setting kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueError {
    pub expected: &'static str,
    pub got: SettingValue,
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {} value, got `{}`", self.expected, self.got)
    }
}

impl Error for ValueError {}

impl SettingKind {
    /// Short kind label used in errors and console output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::File { is_dir: false } => "file",
            Self::File { is_dir: true } => "directory",
            Self::Choice(_) => "choice",
        }
    }

    /// Value used when a declaration gives no initial value.
    pub fn default_value(&self) -> SettingValue {
        match self {
            Self::Bool => SettingValue::Bool(false),
            Self::Int => SettingValue::Int(0),
            Self::Float => SettingValue::Float(0.0),
            Self::Text | Self::File { .. } => SettingValue::Text(String::new()),
            Self::Choice(choices) => {
                SettingValue::Text(choices.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Coerces `value` into this kind.
    pub fn coerce(&self, value: SettingValue) -> Result<SettingValue, ValueError> {
        let reject = |got: SettingValue| ValueError {
            expected: self.label(),
            got,
        };
        match (self, value) {
            (Self::Bool, SettingValue::Bool(v)) => Ok(SettingValue::Bool(v)),
            (Self::Bool, SettingValue::Int(v)) if v == 0 || v == 1 => {
                Ok(SettingValue::Bool(v == 1))
            }
            (Self::Bool, SettingValue::Text(text)) => {
                parse_bool(&text).map(SettingValue::Bool).ok_or_else(|| reject(SettingValue::Text(text)))
            }

            (Self::Int, SettingValue::Int(v)) => Ok(SettingValue::Int(v)),
            (Self::Int, SettingValue::Float(v))
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 =>
            {
                Ok(SettingValue::Int(v as i64))
            }
            (Self::Int, SettingValue::Text(text)) => match text.trim().parse::<i64>() {
                Ok(v) => Ok(SettingValue::Int(v)),
                Err(_) => Err(reject(SettingValue::Text(text))),
            },

            (Self::Float, SettingValue::Float(v)) => Ok(SettingValue::Float(v)),
            (Self::Float, SettingValue::Int(v)) => Ok(SettingValue::Float(v as f64)),
            (Self::Float, SettingValue::Text(text)) => match text.trim().parse::<f64>() {
                Ok(v) => Ok(SettingValue::Float(v)),
                Err(_) => Err(reject(SettingValue::Text(text))),
            },

            (Self::Text | Self::File { .. }, SettingValue::Text(text)) => {
                Ok(SettingValue::Text(text))
            }
            (Self::Text | Self::File { .. }, other) => Ok(SettingValue::Text(other.to_string())),

            (Self::Choice(choices), SettingValue::Text(text)) => {
                if choices.iter().any(|choice| choice == &text) {
                    Ok(SettingValue::Text(text))
                } else {
                    Err(reject(SettingValue::Text(text)))
                }
            }

            (_, other) => Err(reject(other)),
        }
    }

    /// Canonical string form written to INI files.
    pub fn ini_string(&self, value: &SettingValue) -> String {
        value.to_string()
    }

    /// Parses the canonical INI string form back into a value.
    pub fn parse_ini(&self, raw: &str) -> Result<SettingValue, ValueError> {
        self.coerce(SettingValue::Text(raw.to_string()))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingKind, SettingValue};

    #[test]
    fn bool_accepts_common_spellings() {
        for raw in ["True", " yes", "1", "ON"] {
            assert_eq!(
                SettingKind::Bool.parse_ini(raw).expect("truthy spelling"),
                SettingValue::Bool(true)
            );
        }
        assert!(SettingKind::Bool.parse_ini("maybe").is_err());
    }

    #[test]
    fn float_string_keeps_decimal_point_and_round_trips() {
        let kind = SettingKind::Float;
        for value in [1.0, 0.1, -2.5e-12, 1e300] {
            let text = kind.ini_string(&SettingValue::Float(value));
            assert!(text.contains('.') || text.contains('e'), "{text}");
            assert_eq!(
                kind.parse_ini(&text).expect("float round trip"),
                SettingValue::Float(value)
            );
        }
    }

    #[test]
    fn int_narrows_only_integral_floats() {
        assert_eq!(
            SettingKind::Int.coerce(SettingValue::Float(3.0)).expect("integral"),
            SettingValue::Int(3)
        );
        assert!(SettingKind::Int.coerce(SettingValue::Float(3.5)).is_err());
    }

    #[test]
    fn choice_rejects_non_members() {
        let kind = SettingKind::Choice(vec!["a".to_string(), "b".to_string()]);
        assert!(kind.coerce("b".into()).is_ok());
        let err = kind.coerce("c".into()).expect_err("c is not a choice");
        assert_eq!(err.expected, "choice");
        assert_eq!(kind.default_value(), SettingValue::Text("a".to_string()));
    }

    #[test]
    fn text_stringifies_other_values() {
        assert_eq!(
            SettingKind::Text.coerce(SettingValue::Int(7)).expect("int as text"),
            SettingValue::Text("7".to_string())
        );
    }
}
