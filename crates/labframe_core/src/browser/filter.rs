//! Name filters for the file listing.

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

/// Comma-separated, case-insensitive glob list (`*` and `?` wildcards).
///
/// An empty list matches every file.
#[derive(Debug, Clone)]
pub struct FileFilter {
    patterns: Vec<String>,
    matchers: Vec<Regex>,
}

impl FileFilter {
    pub fn parse(spec: &str) -> Self {
        let patterns: Vec<String> = spec
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect();
        let matchers = patterns
            .iter()
            .filter_map(|pattern| Regex::new(&glob_to_regex(pattern)).ok())
            .collect();
        Self { patterns, matchers }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matchers.is_empty() || self.matchers.iter().any(|re| re.is_match(file_name))
    }

    /// Sub-directories of `dir` plus the files accepted by this filter,
    /// sorted by name.
    pub fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() || self.matches(&entry.file_name().to_string_lossy()) {
                entries.push(path);
            }
        }
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(entries)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}
