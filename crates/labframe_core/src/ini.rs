//! INI persistence for path-keyed setting values.
//!
//! # Responsibility
//! - Serialize a `path -> string` map into INI text and back.
//! - Report file-system and syntax failures as `IniError`.
//!
//! # Invariants
//! - `parse_ini_str(&to_ini_string(m, _)) == m` for every map whose paths
//!   have no empty segments.
//! - Paths without `/` are top-level keys; others split at the last `/`
//!   into `[section]` and key.
//! - The codec does not know which paths exist; that check belongs to the
//!   safe write step.

use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]*)\]$").expect("section pattern is valid"));
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^=]*?)\s*=\s?(.*)$").expect("entry pattern is valid"));

/// Persistence failures. Fatal to one save/load call only.
#[derive(Debug)]
pub enum IniError {
    NotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        line: usize,
        message: String,
    },
}

impl Display for IniError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "settings file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Malformed { line, message } => {
                write!(f, "malformed settings file at line {line}: {message}")
            }
        }
    }
}

impl Error for IniError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotFound(_) | Self::Malformed { .. } => None,
        }
    }
}

/// Renders `settings` as INI text, optionally prefixed by a `#` comment.
pub fn to_ini_string(settings: &BTreeMap<String, String>, header: Option<&str>) -> String {
    let mut top_level = Vec::new();
    let mut sections: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (path, value) in settings {
        match path.rsplit_once('/') {
            Some((section, key)) => sections
                .entry(section)
                .or_default()
                .push((key, value.as_str())),
            None => top_level.push((path.as_str(), value.as_str())),
        }
    }

    let mut out = String::new();
    if let Some(header) = header {
        for line in header.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    for (key, value) in top_level {
        push_entry(&mut out, key, value);
    }
    for (section, entries) in sections {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push('[');
        out.push_str(section);
        out.push_str("]\n");
        for (key, value) in entries {
            push_entry(&mut out, key, value);
        }
    }
    out
}

/// Parses INI text into `path -> raw value`.
///
/// # Errors
/// - `IniError::Malformed` for unterminated or empty section headers,
///   lines without `=`, empty keys, and keys repeated within one section.
pub fn parse_ini_str(text: &str) -> Result<BTreeMap<String, String>, IniError> {
    let mut settings = BTreeMap::new();
    let mut section: Option<String> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let captures = SECTION_RE.captures(line).ok_or_else(|| IniError::Malformed {
                line: line_no,
                message: format!("unterminated section header `{line}`"),
            })?;
            let name = captures[1].trim();
            if name.is_empty() {
                return Err(IniError::Malformed {
                    line: line_no,
                    message: "empty section name".to_string(),
                });
            }
            section = Some(name.to_string());
            continue;
        }

        let captures = ENTRY_RE.captures(line).ok_or_else(|| IniError::Malformed {
            line: line_no,
            message: format!("expected `key = value`, got `{line}`"),
        })?;
        let key = captures[1].trim();
        if key.is_empty() {
            return Err(IniError::Malformed {
                line: line_no,
                message: "empty key".to_string(),
            });
        }
        let path = match &section {
            Some(section) => format!("{section}/{key}"),
            None => key.to_string(),
        };
        if settings.contains_key(&path) {
            return Err(IniError::Malformed {
                line: line_no,
                message: format!("duplicate key `{key}`"),
            });
        }
        settings.insert(path, decode_value(&captures[2]));
    }

    Ok(settings)
}

/// Writes `settings` to `file`, replacing previous content.
pub fn save_settings(
    file: impl AsRef<Path>,
    settings: &BTreeMap<String, String>,
    header: Option<&str>,
) -> Result<(), IniError> {
    let file = file.as_ref();
    let text = to_ini_string(settings, header);
    match std::fs::write(file, text) {
        Ok(()) => {
            info!(
                "event=ini_save module=ini status=ok entries={} path={}",
                settings.len(),
                file.display()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=ini_save module=ini status=error path={} error={}",
                file.display(),
                err
            );
            Err(IniError::Io {
                path: file.to_path_buf(),
                source: err,
            })
        }
    }
}

/// Reads and parses `file`.
///
/// # Errors
/// - `IniError::NotFound` when the file does not exist.
/// - `IniError::Io` for other read failures.
/// - `IniError::Malformed` for syntax errors.
pub fn load_settings(file: impl AsRef<Path>) -> Result<BTreeMap<String, String>, IniError> {
    let file = file.as_ref();
    let text = std::fs::read_to_string(file).map_err(|err| {
        error!(
            "event=ini_load module=ini status=error path={} error={}",
            file.display(),
            err
        );
        if err.kind() == ErrorKind::NotFound {
            IniError::NotFound(file.to_path_buf())
        } else {
            IniError::Io {
                path: file.to_path_buf(),
                source: err,
            }
        }
    })?;
    let settings = parse_ini_str(&text)?;
    info!(
        "event=ini_load module=ini status=ok entries={} path={}",
        settings.len(),
        file.display()
    );
    Ok(settings)
}

fn push_entry(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(" = ");
    out.push_str(&encode_value(value));
    out.push('\n');
}

fn encode_value(value: &str) -> String {
    let needs_quotes = value.starts_with('"')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    let mut encoded = String::with_capacity(value.len() + 2);
    if needs_quotes {
        encoded.push('"');
    }
    for ch in value.chars() {
        match ch {
            '\\' => encoded.push_str("\\\\"),
            '\n' => encoded.push_str("\\n"),
            '\r' => encoded.push_str("\\r"),
            '"' if needs_quotes => encoded.push_str("\\\""),
            other => encoded.push(other),
        }
    }
    if needs_quotes {
        encoded.push('"');
    }
    encoded
}

fn decode_value(raw: &str) -> String {
    let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
    let body = if quoted { &raw[1..raw.len() - 1] } else { raw };

    let mut decoded = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('\\') => decoded.push('\\'),
            Some('"') => decoded.push('"'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::{parse_ini_str, to_ini_string, IniError};
    use std::collections::BTreeMap;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn groups_paths_by_section() {
        let text = to_ini_string(
            &map(&[
                ("app/browse_dir", "/data"),
                ("view/image/gamma", "1.5"),
                ("bare", "x"),
            ]),
            Some("saved by test"),
        );
        assert_eq!(
            text,
            "# saved by test\nbare = x\n\n[app]\nbrowse_dir = /data\n\n[view/image]\ngamma = 1.5\n"
        );
    }

    #[test]
    fn awkward_strings_round_trip() {
        let original = map(&[
            ("app/multi", "line one\nline two\r\n"),
            ("app/padded", "  spaced  "),
            ("app/quoted", "\"already quoted\""),
            ("app/backslash", r"C:\data\new"),
            ("app/equals", "a = b"),
            ("app/empty", ""),
            ("app/hash", "#not a comment"),
        ]);
        let parsed = parse_ini_str(&to_ini_string(&original, None)).expect("parse back");
        assert_eq!(parsed, original);
    }

    #[test]
    fn tolerates_comments_and_loose_spacing() {
        let parsed = parse_ini_str("; comment\n[app]\n  key=value\n# trailing\n[ view/x ]\nk =  v\n")
            .expect("valid ini");
        assert_eq!(parsed, map(&[("app/key", "value"), ("view/x/k", " v")]));
    }

    #[test]
    fn reports_malformed_lines() {
        for (text, expected_line) in [
            ("[app\nkey = 1\n", 1),
            ("[app]\njust text\n", 2),
            ("[]\n", 1),
            ("[app]\n = 3\n", 2),
            ("[app]\nk = 1\nk = 2\n", 3),
        ] {
            match parse_ini_str(text) {
                Err(IniError::Malformed { line, .. }) => assert_eq!(line, expected_line, "{text:?}"),
                other => panic!("expected malformed error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_text_is_empty_map() {
        assert!(parse_ini_str("\n# only a comment\n")
            .expect("empty file parses")
            .is_empty());
    }
}
