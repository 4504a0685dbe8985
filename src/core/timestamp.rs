//! Timestamp formatting for the `asctime` attribute
//!
//! A formatter's `datefmt` is a strftime layout. Without one, timestamps are
//! rendered as `2025-01-08 10:30:45,123` (local time, milliseconds after a
//! comma).

use super::error::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

const DEFAULT_LAYOUT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// How `asctime` is rendered
///
/// # Examples
///
/// ```
/// use dicomjson_logging::core::DateFormat;
///
/// let format = DateFormat::parse(Some("%d/%b/%Y:%H:%M:%S %z")).unwrap();
/// assert!(matches!(format, DateFormat::Custom(_)));
///
/// assert!(DateFormat::parse(Some("%Q")).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// `2025-01-08 10:30:45,123`
    #[default]
    Default,

    /// Any strftime-compatible layout, validated when parsed
    Custom(String),
}

impl DateFormat {
    /// Build from an optional `datefmt`, rejecting unknown strftime directives
    pub fn parse(datefmt: Option<&str>) -> Result<Self> {
        match datefmt {
            None => Ok(DateFormat::Default),
            Some(layout) => {
                if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
                    return Err(LoggerError::formatter(
                        layout,
                        "datefmt contains an unsupported strftime directive",
                    ));
                }
                Ok(DateFormat::Custom(layout.to_string()))
            }
        }
    }

    #[must_use]
    pub fn format(&self, datetime: &DateTime<Local>) -> String {
        match self {
            DateFormat::Default => datetime.format(DEFAULT_LAYOUT).to_string(),
            DateFormat::Custom(layout) => datetime.format(layout).to_string(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &str {
        match self {
            DateFormat::Default => DEFAULT_LAYOUT,
            DateFormat::Custom(layout) => layout,
        }
    }
}
