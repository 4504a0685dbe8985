//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Local};
use std::cell::RefCell;
use std::path::Path;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                // "ThreadId(7)" -> "7"
                let raw = format!("{:?}", std::thread::current().id());
                raw.trim_start_matches("ThreadId(")
                    .trim_end_matches(')')
                    .to_string()
            })
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// A single logging event as seen by handlers and formatters.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Name of the logger that created the record (`root` for the root logger)
    pub name: String,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process_id: u32,
    /// Rendered error chain attached by `Logger::exception`
    pub error_chain: Option<String>,
}

impl LogRecord {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so a single record always renders as a single line of its own text.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(name: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            message: Self::sanitize_message(&message.into()),
            timestamp: Local::now(),
            file: None,
            line: None,
            module_path: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            process_id: std::process::id(),
            error_chain: None,
        }
    }

    pub fn with_location(mut self, file: &str, line: u32, module_path: &str) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self.module_path = Some(module_path.to_string());
        self
    }

    /// Attach an error and its `source()` chain, one cause per line.
    pub fn with_error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut rendered = format!("Error: {}", Self::sanitize_message(&error.to_string()));
        let mut source = error.source();
        while let Some(cause) = source {
            rendered.push_str("\nCaused by: ");
            rendered.push_str(&Self::sanitize_message(&cause.to_string()));
            source = cause.source();
        }
        self.error_chain = Some(rendered);
        self
    }

    /// Base name of the source file, when the call site is known
    pub fn file_name(&self) -> Option<&str> {
        self.file
            .as_deref()
            .map(|f| Path::new(f).file_name().and_then(|n| n.to_str()).unwrap_or(f))
    }

    /// Source file name without its extension
    pub fn module(&self) -> Option<&str> {
        self.file
            .as_deref()
            .map(|f| Path::new(f).file_stem().and_then(|n| n.to_str()).unwrap_or(f))
    }

    /// Thread name, falling back to the numeric thread id
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);
    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "cannot read file")
        }
    }
    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "invalid DICOM preamble")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }
    impl std::error::Error for Inner {}

    #[test]
    fn test_message_is_sanitized() {
        let record = LogRecord::new("root", LogLevel::Info, "a\nb\tc");
        assert_eq!(record.message, "a\\nb\\tc");
    }

    #[test]
    fn test_location_helpers() {
        let record = LogRecord::new("root", LogLevel::Info, "m").with_location(
            "src/bin/dicom2json.rs",
            42,
            "dicom2json",
        );
        assert_eq!(record.file_name(), Some("dicom2json.rs"));
        assert_eq!(record.module(), Some("dicom2json"));
        assert_eq!(record.line, Some(42));
    }

    #[test]
    fn test_error_chain() {
        let record = LogRecord::new("root", LogLevel::Error, "conversion failed")
            .with_error(&Outer(Inner));
        assert_eq!(
            record.error_chain.as_deref(),
            Some("Error: cannot read file\nCaused by: invalid DICOM preamble")
        );
    }

    #[test]
    fn test_thread_label_falls_back_to_id() {
        let handle = std::thread::spawn(|| LogRecord::new("root", LogLevel::Info, "m"));
        let record = handle.join().unwrap();
        assert!(record.thread_name.is_none());
        assert_eq!(record.thread_label(), record.thread_id);
        assert!(record.thread_id.chars().all(|c| c.is_ascii_digit()));
    }
}
