//! Structured JSON logger for repovault
//!
//! - One log line = one event
//! - `event` first, `severity` second, remaining fields sorted by key
//! - Synchronous, no buffering beyond the sink itself
//!
//! The logger is a cloneable handle over a shared sink. Components receive it
//! through [`Diagnostics`](super::Diagnostics) instead of reaching for a
//! process-wide logger, so tests can capture output and embedders can silence
//! it entirely.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where rendered log lines go.
enum Sink {
    /// INFO and below to stdout, WARN and above to stderr
    Console,
    /// In-memory capture, shared with a [`LogBuffer`]
    Buffer(Arc<Mutex<Vec<u8>>>),
    /// Drop everything
    Disabled,
}

/// A structured logger that outputs JSON lines.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Sink>,
    min_severity: Severity,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match *self.sink {
            Sink::Console => "console",
            Sink::Buffer(_) => "buffer",
            Sink::Disabled => "disabled",
        };
        f.debug_struct("Logger")
            .field("sink", &sink)
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Logger {
    /// Logger writing to stdout/stderr at INFO and above.
    pub fn console() -> Self {
        Self {
            sink: Arc::new(Sink::Console),
            min_severity: Severity::Info,
        }
    }

    /// Logger that discards every line.
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(Sink::Disabled),
            min_severity: Severity::Error,
        }
    }

    /// Logger capturing every line (TRACE and above) into memory.
    pub fn buffered() -> (Self, LogBuffer) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            sink: Arc::new(Sink::Buffer(Arc::clone(&buffer))),
            min_severity: Severity::Trace,
        };
        (logger, LogBuffer(buffer))
    }

    /// Returns a copy of this logger that drops lines below `severity`.
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Whether a line at `severity` would be written.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        !matches!(*self.sink, Sink::Disabled) && severity >= self.min_severity
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.is_enabled(severity) {
            return;
        }

        let line = render(severity, event, fields);

        // Write atomically (one write per line)
        match &*self.sink {
            Sink::Console => {
                if severity >= Severity::Warn {
                    let _ = io::stderr().write_all(line.as_bytes());
                } else {
                    let mut out = io::stdout();
                    let _ = out.write_all(line.as_bytes());
                    let _ = out.flush();
                }
            }
            Sink::Buffer(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.extend_from_slice(line.as_bytes());
                }
            }
            Sink::Disabled => {}
        }
    }

    /// Log at TRACE level
    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}

/// Handle onto the lines captured by [`Logger::buffered`].
#[derive(Clone)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
            .unwrap_or_default()
    }

    /// Captured lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Captured lines whose `event` equals `event`.
    pub fn events_named(&self, event: &str) -> Vec<String> {
        let needle = format!("{{\"event\":\"{}\"", event);
        self.lines()
            .into_iter()
            .filter(|line| line.starts_with(&needle))
            .collect()
    }
}

/// Render one JSON log line, newline included.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    // Built by hand to keep key order deterministic
    let mut output = String::with_capacity(256);

    output.push('{');

    output.push_str("\"event\":\"");
    escape_json_string(&mut output, event);
    output.push('"');

    output.push_str(",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output.push('\n');
    output
}

/// Escape special characters for JSON strings
fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_log_json_format() {
        let (logger, buffer) = Logger::buffered();
        logger.info("TEST_EVENT", &[]);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "TEST_EVENT");
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let a = render(Severity::Info, "TEST", &[("zebra", "1"), ("apple", "2"), ("mango", "3")]);
        let b = render(Severity::Info, "TEST", &[("apple", "2"), ("mango", "3"), ("zebra", "1")]);
        assert_eq!(a, b);

        let apple = a.find("apple").unwrap();
        let mango = a.find("mango").unwrap();
        let zebra = a.find("zebra").unwrap();
        assert!(apple < mango && mango < zebra);
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let line = render(Severity::Warn, "TEST", &[("message", "hello \"world\"\nline2\u{1}")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2\u{1}");
        assert_eq!(line.chars().filter(|c| *c == '\n').count(), 1);
    }

    #[test]
    fn test_min_severity_filters() {
        let (logger, buffer) = Logger::buffered();
        let logger = logger.with_min_severity(Severity::Warn);

        logger.trace("DROPPED", &[]);
        logger.info("DROPPED", &[]);
        logger.warn("KEPT", &[]);
        logger.error("KEPT", &[]);

        assert_eq!(buffer.events_named("KEPT").len(), 2);
        assert!(buffer.events_named("DROPPED").is_empty());
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = Logger::disabled();
        assert!(!logger.is_enabled(Severity::Error));
        logger.error("NOTHING", &[("a", "b")]);
    }

    #[test]
    fn test_clones_share_sink() {
        let (logger, buffer) = Logger::buffered();
        let clone = logger.clone();
        logger.info("ONE", &[]);
        clone.info("TWO", &[]);
        assert_eq!(buffer.lines().len(), 2);
    }
}
