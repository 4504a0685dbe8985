//! Stream handler writing formatted records to stdout, stderr or any writer

use crate::core::{Formatter, Handler, LogLevel, LogRecord, Result};
use std::io::{self, Write};
use std::sync::Arc;

#[cfg(feature = "console")]
use colored::Colorize;

/// Process stream a [`StreamHandler`] is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTarget {
    Stdout,
    Stderr,
}

impl StreamTarget {
    /// Accepts `ext://sys.stdout`, `ext://sys.stderr` and the bare
    /// `stdout` / `stderr` spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "ext://sys.stdout" | "stdout" => Some(StreamTarget::Stdout),
            "ext://sys.stderr" | "stderr" => Some(StreamTarget::Stderr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamTarget::Stdout => "ext://sys.stdout",
            StreamTarget::Stderr => "ext://sys.stderr",
        }
    }
}

enum Sink {
    Stdout,
    Stderr,
    Writer(Box<dyn Write + Send>),
}

impl Sink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            Sink::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()
            }
            Sink::Writer(writer) => {
                writer.write_all(line.as_bytes())?;
                writer.flush()
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Writer(writer) => writer.flush(),
        }
    }
}

/// Writes one formatted line per record and flushes after each one.
///
/// # Example
///
/// ```
/// use dicomjson_logging::handlers::StreamHandler;
/// use dicomjson_logging::{Formatter, LogLevel};
/// use std::sync::Arc;
///
/// let formatter = Formatter::new("%(levelname)s %(message)s", None).unwrap();
/// let handler = StreamHandler::stdout()
///     .with_name("console")
///     .with_level(Some(LogLevel::Debug))
///     .with_formatter(Arc::new(formatter));
/// ```
pub struct StreamHandler {
    name: String,
    level: Option<LogLevel>,
    formatter: Arc<Formatter>,
    sink: Sink,
    use_colors: bool,
}

impl StreamHandler {
    pub fn new(target: StreamTarget) -> Self {
        let sink = match target {
            StreamTarget::Stdout => Sink::Stdout,
            StreamTarget::Stderr => Sink::Stderr,
        };
        Self::with_sink(sink)
    }

    pub fn stdout() -> Self {
        Self::new(StreamTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(StreamTarget::Stderr)
    }

    /// Write to an arbitrary sink instead of a process stream
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self::with_sink(Sink::Writer(writer))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            name: "console".to_string(),
            level: None,
            formatter: Arc::new(Formatter::default()),
            sink,
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Color whole lines by level. Ignored without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    #[cfg(feature = "console")]
    fn paint(&self, text: String, level: LogLevel) -> String {
        if self.use_colors {
            text.color(level.color_code()).to_string()
        } else {
            text
        }
    }

    #[cfg(not(feature = "console"))]
    fn paint(&self, text: String, _level: LogLevel) -> String {
        text
    }
}

impl Handler for StreamHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Option<LogLevel> {
        self.level
    }

    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let mut line = self.paint(self.formatter.format(record), record.level);
        line.push('\n');
        self.sink.write_line(&line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
