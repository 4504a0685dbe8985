//! Logging macros with `format!` syntax
//!
//! The macros check the logger's effective level before formatting, so
//! arguments of a filtered call are never rendered. Records created through
//! them carry the call site's file, line and module path, which the
//! `filename`, `pathname`, `lineno` and `module` template attributes use.
//!
//! # Examples
//!
//! ```
//! use dicomjson_logging::{info, LogLevel, Logger};
//! use dicomjson_logging::handlers::NullHandler;
//!
//! let logger = Logger::builder()
//!     .name("dicom2json")
//!     .level(LogLevel::Info)
//!     .handler(NullHandler::new())
//!     .build();
//!
//! info!(logger, "Converted {} of {} files", 3, 4);
//! ```

/// Log at an explicit level.
///
/// ```
/// # use dicomjson_logging::{Logger, LogLevel};
/// # let logger = Logger::builder().build();
/// use dicomjson_logging::log;
/// log!(logger, LogLevel::Error, "Unreadable file: {}", "a.dcm");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger.handle(
                $crate::LogRecord::new(logger.name(), level, format!($($arg)+))
                    .with_location(file!(), line!(), module_path!()),
            );
        }
    }};
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
