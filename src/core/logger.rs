//! Logger nodes
//!
//! A [`Logger`] owns a threshold and a list of handlers. Loggers obtained from
//! a [`Manager`](super::Manager) form a dotted-name hierarchy below `root`:
//! a record is passed to the logger's own handlers and then, while
//! `propagate` is set, to every ancestor's handlers.

use super::{
    error::Result,
    handler::{self, Handler, SharedHandler},
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggerMetrics,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ROOT_LOGGER_NAME: &str = "root";

pub struct Logger {
    name: String,
    parent: Option<Arc<Logger>>,
    level: RwLock<Option<LogLevel>>,
    handlers: RwLock<Vec<SharedHandler>>,
    propagate: AtomicBool,
    disabled: AtomicBool,
    /// Set once the logger was asked for by name or configured; ancestors
    /// created only to link the hierarchy stay unset
    requested: AtomicBool,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// A root logger starts at WARNING with no handlers
    pub(crate) fn root(metrics: Arc<LoggerMetrics>) -> Self {
        Self {
            name: ROOT_LOGGER_NAME.to_string(),
            parent: None,
            level: RwLock::new(Some(LogLevel::Warning)),
            handlers: RwLock::new(Vec::new()),
            propagate: AtomicBool::new(false),
            disabled: AtomicBool::new(false),
            requested: AtomicBool::new(true),
            metrics,
        }
    }

    pub(crate) fn child(name: impl Into<String>, parent: Arc<Logger>) -> Self {
        let metrics = Arc::clone(&parent.metrics);
        Self {
            name: name.into(),
            parent: Some(parent),
            level: RwLock::new(None),
            handlers: RwLock::new(Vec::new()),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            requested: AtomicBool::new(false),
            metrics,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Logger>> {
        self.parent.as_ref()
    }

    /// The logger's own threshold; `None` defers to its ancestors
    pub fn level(&self) -> Option<LogLevel> {
        *self.level.read()
    }

    pub fn set_level(&self, level: Option<LogLevel>) {
        *self.level.write() = level;
    }

    /// Own threshold, or the nearest ancestor's that is set
    pub fn effective_level(&self) -> Option<LogLevel> {
        let mut current = Some(self);
        while let Some(logger) = current {
            if let Some(level) = logger.level() {
                return Some(level);
            }
            current = logger.parent.as_deref();
        }
        None
    }

    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        !self.is_disabled() && LogLevel::passes(level, self.effective_level())
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Relaxed)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_requested(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn add_handler(&self, handler: SharedHandler) {
        self.handlers.write().push(handler);
    }

    /// Detach the first handler with the given name
    pub fn remove_handler(&self, name: &str) -> Option<SharedHandler> {
        let mut handlers = self.handlers.write();
        let index = handlers.iter().position(|h| h.lock().name() == name)?;
        Some(handlers.remove(index))
    }

    pub(crate) fn replace_handlers(&self, handlers: Vec<SharedHandler>) -> Vec<SharedHandler> {
        std::mem::replace(&mut *self.handlers.write(), handlers)
    }

    /// Handlers attached directly to this logger, in attachment order
    pub fn handlers(&self) -> Vec<SharedHandler> {
        self.handlers.read().clone()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .iter()
            .map(|h| h.lock().name().to_string())
            .collect()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.is_enabled_for(level) {
            return;
        }
        self.handle(LogRecord::new(self.name.as_str(), level, message));
    }

    /// Dispatch an already-built record. The caller is expected to have
    /// checked [`Logger::is_enabled_for`]; only the disabled flag is
    /// re-checked here.
    pub fn handle(&self, record: LogRecord) {
        if self.is_disabled() {
            return;
        }
        self.call_handlers(&record);
    }

    fn call_handlers(&self, record: &LogRecord) {
        let mut found = 0usize;
        let mut wrote = false;
        let mut has_error = false;

        let mut current = Some(self);
        while let Some(logger) = current {
            for shared in logger.handlers.read().iter() {
                found += 1;
                match handler::dispatch(shared, record, &self.metrics) {
                    Some(true) => wrote = true,
                    Some(false) => has_error = true,
                    None => {}
                }
            }
            if !logger.propagate() {
                break;
            }
            current = logger.parent.as_deref();
        }

        if found == 0 {
            // No handler anywhere in the chain: WARNING and above still go to stderr
            if record.level >= LogLevel::Warning {
                eprintln!("{}", record.message);
                self.metrics.record_last_resort();
            }
        } else if wrote && !has_error {
            self.metrics.record_written();
        }
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Log at ERROR with the error's `source()` chain attached
    ///
    /// # Example
    ///
    /// ```
    /// use dicomjson_logging::prelude::*;
    ///
    /// let logger = Logger::builder().level(LogLevel::Debug).build();
    /// let err = std::io::Error::new(std::io::ErrorKind::NotFound, "image.dcm");
    /// logger.exception("Failed to read input", &err);
    /// ```
    pub fn exception(&self, message: impl Into<String>, error: &(dyn std::error::Error + 'static)) {
        if !self.is_enabled_for(LogLevel::Error) {
            return;
        }
        self.handle(LogRecord::new(self.name.as_str(), LogLevel::Error, message).with_error(error));
    }

    /// Flush the handlers attached directly to this logger
    pub fn flush(&self) -> Result<()> {
        for shared in self.handlers.read().iter() {
            handler::flush_isolated(shared)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("handlers", &self.handler_names())
            .field("propagate", &self.propagate())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

/// Builder for a standalone logger that is not registered with a manager
///
/// # Example
/// ```
/// use dicomjson_logging::prelude::*;
///
/// let logger = Logger::builder()
///     .name("dicom2json")
///     .level(LogLevel::Debug)
///     .handler(StreamHandler::stderr())
///     .build();
/// logger.debug("ready");
/// ```
pub struct LoggerBuilder {
    name: String,
    level: Option<LogLevel>,
    handlers: Vec<SharedHandler>,
    metrics: Option<Arc<LoggerMetrics>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            name: ROOT_LOGGER_NAME.to_string(),
            level: Some(LogLevel::Warning),
            handlers: Vec::new(),
            metrics: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Accept records of every level
    #[must_use = "builder methods return a new value"]
    pub fn notset(mut self) -> Self {
        self.level = None;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(handler::share(handler));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_handler(mut self, handler: SharedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Logger {
        let mut logger = Logger::root(self.metrics.unwrap_or_default());
        logger.name = self.name;
        *logger.level.get_mut() = self.level;
        *logger.handlers.get_mut() = self.handlers;
        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a builder for a standalone Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}
