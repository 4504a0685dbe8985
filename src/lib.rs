//! # dicomjson logging
//!
//! Declarative logging for the dicomjson conversion tools, modelled on the
//! dictionary configuration schema of Python's `logging` module.
//!
//! A YAML or JSON document declares named formatters, named handlers that
//! reference them, and the loggers the handlers are attached to. The
//! document is validated as soon as it is loaded; applying it to a
//! [`Manager`] opens the destinations and wires the logger tree.
//!
//! ## Features
//!
//! - **Eager validation**: dangling formatter or handler references, bad
//!   levels and malformed templates fail at load time
//! - **Handlers**: console streams, plain and size-rotating files with an
//!   exclusive lock, a background queue, and a null sink
//! - **Logger hierarchy**: dotted names, level inheritance and propagation
//! - **Fault isolation**: a failing or panicking handler never stops the
//!   others or the caller
//!
//! ## Example
//!
//! ```no_run
//! use dicomjson_logging::{get_logger, info, init_default, shutdown, warning};
//!
//! init_default().expect("logging configuration");
//!
//! let log = get_logger("dicom2json");
//! info!(log, "converted {} instances", 12);
//! warning!(log, "tag {} has no value", "(0010,0010)");
//!
//! // The process-wide manager is never dropped; flush and close explicitly
//! shutdown();
//! ```

pub mod config;
pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    pub use crate::config::{Configurator, LoggingConfig};
    pub use crate::core::{
        Formatter, Handler, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError,
        LoggerMetrics, Manager, Result, SharedHandler,
    };
    pub use crate::core::manager::{get_logger, init, init_default, root};
    pub use crate::handlers::{
        FileHandler, NullHandler, QueueHandler, RotatingFileHandler, RotationPolicy,
        StreamHandler, StreamTarget,
    };
}

pub use config::LoggingConfig;
pub use core::manager::{get_logger, init, init_default, manager, root, shutdown};
pub use core::{
    share, DateFormat, Formatter, Handler, LogLevel, LogRecord, Logger, LoggerBuilder,
    LoggerError, LoggerMetrics, Manager, MetricsSnapshot, Result, SharedHandler, ROOT_LOGGER_NAME,
};
pub use handlers::DEFAULT_SHUTDOWN_TIMEOUT;
