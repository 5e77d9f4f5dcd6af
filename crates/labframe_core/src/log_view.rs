//! HTML log view fed by the logger.
//!
//! # Responsibility
//! - Render log records as escaped, level-coloured HTML lines.
//! - Keep the most recent lines in a bounded buffer a viewer can poll.
//!
//! # Invariants
//! - The buffer never holds more than `capacity` lines; oldest drop first.
//! - Record text is always HTML-escaped.

use flexi_logger::writers::LogWriter;
use flexi_logger::DeferredNow;
use log::{Level, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_LOG_VIEW_CAPACITY: usize = 1000;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Shared, bounded list of HTML-formatted log lines.
#[derive(Debug, Clone)]
pub struct HtmlLogView {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl HtmlLogView {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, html_line: String) {
        let mut lines = self.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(html_line);
    }

    /// Buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Complete HTML document of the buffered lines.
    pub fn to_html_document(&self) -> String {
        let mut out = String::from("<html><body style=\"font-family: monospace\">\n");
        for line in self.lock().iter() {
            out.push_str(line);
            out.push_str("<br/>\n");
        }
        out.push_str("</body></html>\n");
        out
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while holding the lock leaves only complete lines behind.
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HtmlLogView {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_VIEW_CAPACITY)
    }
}

/// Formats one record as an HTML line.
pub fn format_html_record(timestamp: &str, level: Level, target: &str, message: &str) -> String {
    format!(
        "<span style=\"color:gray\">{}</span> <span style=\"color:{}\"><b>{}</b></span> \
         <i>{}</i>: {}",
        escape_html(timestamp),
        level_color(level),
        level.as_str(),
        escape_html(target),
        escape_html(message)
    )
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "red",
        Level::Warn => "orange",
        Level::Info => "green",
        Level::Debug => "blue",
        Level::Trace => "gray",
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br/>"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `flexi_logger` writer that appends every record to an [`HtmlLogView`].
pub(crate) struct HtmlLogWriter {
    view: HtmlLogView,
}

impl HtmlLogWriter {
    pub(crate) fn new(view: HtmlLogView) -> Self {
        Self { view }
    }
}

impl LogWriter for HtmlLogWriter {
    fn write(&self, now: &mut DeferredNow, record: &Record<'_>) -> std::io::Result<()> {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        self.view.push(format_html_record(
            &timestamp,
            record.level(),
            record.target(),
            &record.args().to_string(),
        ));
        Ok(())
    }

    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}
