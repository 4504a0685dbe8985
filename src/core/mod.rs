//! Core logging types: levels, records, formatters, handlers and loggers

pub mod error;
pub mod formatter;
pub mod handler;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod manager;
pub mod metrics;
pub mod timestamp;

pub use error::{LoggerError, Result};
pub use formatter::{Formatter, DEFAULT_TEMPLATE};
pub use handler::{share, Handler, SharedHandler};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{Logger, LoggerBuilder, ROOT_LOGGER_NAME};
pub use manager::Manager;
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use timestamp::DateFormat;
