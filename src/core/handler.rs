//! Handler trait for log output destinations

use super::{error::Result, log_level::LogLevel, log_record::LogRecord, metrics::LoggerMetrics};
use parking_lot::Mutex;
use std::sync::Arc;

pub trait Handler: Send {
    /// Name the handler was declared under
    fn name(&self) -> &str;

    /// Minimum severity this handler accepts; `None` accepts everything
    fn level(&self) -> Option<LogLevel>;

    /// Write one record that already passed [`Handler::accepts`]
    fn emit(&mut self, record: &LogRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Release the destination. Called when the handler is replaced by a new
    /// configuration or the logging system shuts down.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    #[inline]
    fn accepts(&self, level: LogLevel) -> bool {
        LogLevel::passes(level, self.level())
    }
}

/// A handler shared between loggers (and queue handlers). The mutex makes
/// each handler a single writer: emits, flushes and rotations never interleave.
pub type SharedHandler = Arc<Mutex<Box<dyn Handler>>>;

pub fn share<H: Handler + 'static>(handler: H) -> SharedHandler {
    Arc::new(Mutex::new(Box::new(handler)))
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Hand a record to one handler with panic isolation.
///
/// Returns `None` when the handler's threshold filtered the record out,
/// otherwise whether the write succeeded. Failures and panics are reported
/// on stderr and counted so that the remaining handlers still run.
pub(crate) fn dispatch(
    handler: &SharedHandler,
    record: &LogRecord,
    metrics: &LoggerMetrics,
) -> Option<bool> {
    let mut guard = handler.lock();
    if !guard.accepts(record.level) {
        return None;
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| guard.emit(record)));

    match result {
        Ok(Ok(())) => Some(true),
        Ok(Err(e)) => {
            eprintln!("[LOGGER ERROR] Handler '{}' failed: {}", guard.name(), e);
            metrics.record_handler_error();
            Some(false)
        }
        Err(panic_info) => {
            eprintln!(
                "[LOGGER CRITICAL] Handler '{}' panicked: {}. \
                 Other handlers continue to function.",
                guard.name(),
                panic_message(panic_info.as_ref())
            );
            metrics.record_handler_error();
            Some(false)
        }
    }
}

/// Flush one handler with the same isolation as [`dispatch`]
pub(crate) fn flush_isolated(handler: &SharedHandler) -> Result<()> {
    let mut guard = handler.lock();
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| guard.flush())) {
        Ok(result) => result,
        Err(panic_info) => {
            let message = panic_message(panic_info.as_ref());
            eprintln!(
                "[LOGGER CRITICAL] Handler '{}' panicked during flush: {}",
                guard.name(),
                message
            );
            Err(super::error::LoggerError::other(message))
        }
    }
}
