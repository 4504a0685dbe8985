//! Handler that discards every record

use crate::core::{Handler, LogLevel, LogRecord, Result};

/// Accepts and discards records. Useful to silence a logger without
/// triggering the stderr fallback used when no handler exists.
#[derive(Debug, Clone)]
pub struct NullHandler {
    name: String,
    level: Option<LogLevel>,
}

impl NullHandler {
    pub fn new() -> Self {
        Self {
            name: "null".to_string(),
            level: None,
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
}

impl Default for NullHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for NullHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Option<LogLevel> {
        self.level
    }

    fn emit(&mut self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
