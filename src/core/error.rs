//! Error types for the logging system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration document could not be parsed
    #[error("Malformed {format} logging configuration: {message}")]
    ConfigParse { format: String, message: String },

    /// Schema version other than the supported one
    #[error("Unsupported logging configuration version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// A text handler declared without a formatter reference
    #[error("Handler '{handler}' does not name a formatter")]
    MissingFormatter { handler: String },

    /// A handler references a formatter that is not declared
    #[error("Handler '{handler}' references undeclared formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    /// A logger or queue handler references a handler that is not declared
    #[error("{referrer} references undeclared handler '{handler}'")]
    UnknownHandler { referrer: String, handler: String },

    /// A destination parameter required by the handler class is absent
    #[error("Handler '{handler}' is missing required field '{field}'")]
    MissingField { handler: String, field: String },

    /// Handler class that this engine cannot construct
    #[error("Handler '{handler}' has unsupported class '{class}'")]
    UnsupportedHandlerClass { handler: String, class: String },

    /// Unknown severity level name
    #[error("Invalid level '{level}' for {owner}")]
    InvalidLevel { owner: String, level: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File handler error with path
    #[error("File handler error for '{path}': {message}")]
    FileHandlerError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLockError { path: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Template or date format rejected at compile time
    #[error("Formatter error ({template}): {message}")]
    FormatterError { template: String, message: String },

    /// Queue handler worker is gone
    #[error("Failed to send log record to queue worker")]
    ChannelSendError,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ConfigParse {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn missing_formatter(handler: impl Into<String>) -> Self {
        LoggerError::MissingFormatter {
            handler: handler.into(),
        }
    }

    pub fn unknown_formatter(handler: impl Into<String>, formatter: impl Into<String>) -> Self {
        LoggerError::UnknownFormatter {
            handler: handler.into(),
            formatter: formatter.into(),
        }
    }

    pub fn unknown_handler(referrer: impl Into<String>, handler: impl Into<String>) -> Self {
        LoggerError::UnknownHandler {
            referrer: referrer.into(),
            handler: handler.into(),
        }
    }

    pub fn missing_field(handler: impl Into<String>, field: impl Into<String>) -> Self {
        LoggerError::MissingField {
            handler: handler.into(),
            field: field.into(),
        }
    }

    pub fn invalid_level(owner: impl Into<String>, level: impl Into<String>) -> Self {
        LoggerError::InvalidLevel {
            owner: owner.into(),
            level: level.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file handler error
    pub fn file_handler(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileHandlerError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLockError { path: path.into() }
    }

    /// Create a formatter error
    pub fn formatter(template: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error was raised while reading or validating a document
    /// (as opposed to while opening a destination).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LoggerError::ConfigParse { .. }
                | LoggerError::UnsupportedVersion { .. }
                | LoggerError::MissingFormatter { .. }
                | LoggerError::UnknownFormatter { .. }
                | LoggerError::UnknownHandler { .. }
                | LoggerError::MissingField { .. }
                | LoggerError::UnsupportedHandlerClass { .. }
                | LoggerError::InvalidLevel { .. }
                | LoggerError::InvalidConfiguration { .. }
                | LoggerError::FormatterError { .. }
        )
    }
}
