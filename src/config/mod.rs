//! Declarative logging configuration
//!
//! A [`LoggingConfig`] mirrors the dictionary schema used by Python's
//! `logging.config.dictConfig`: named formatters, named handlers that
//! reference formatters, optional named loggers and the root logger.
//! Documents are read from YAML or JSON and validated as soon as they are
//! loaded, so a dangling reference or a bad level never survives past
//! startup.
//!
//! # Example
//!
//! ```
//! use dicomjson_logging::config::LoggingConfig;
//!
//! let config = LoggingConfig::from_yaml_str(r#"
//! version: 1
//! formatters:
//!   brief:
//!     format: "%(levelname)s %(message)s"
//! handlers:
//!   console:
//!     class: logging.StreamHandler
//!     formatter: brief
//! root:
//!   level: INFO
//!   handlers: [console]
//! "#).unwrap();
//!
//! assert_eq!(config.handlers.len(), 1);
//! ```

mod configure;
mod validate;

pub use configure::{Configurator, WriterFactory};
pub use validate::{ConfigPlan, HandlerKind, HandlerPlan, LoggerPlan, SUPPORTED_VERSION};

use crate::core::{LoggerError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file to load instead of the
/// bundled document
pub const CONFIG_ENV_VAR: &str = "DICOMJSON_LOG_CONFIG";

/// The configuration shipped with the dicomjson tools
pub const DICOMJSON_CONFIG_YAML: &str = include_str!("../../config/logging.yaml");

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    pub version: u32,

    #[serde(default = "default_true")]
    pub disable_existing_loggers: bool,

    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterSpec>,

    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerSpec>,

    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerSpec>,

    #[serde(default)]
    pub root: Option<RootSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterSpec {
    pub format: Option<String>,
    pub datefmt: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSpec {
    pub class: String,
    pub level: Option<String>,
    pub formatter: Option<String>,
    pub stream: Option<String>,
    pub filename: Option<PathBuf>,
    pub mode: Option<String>,
    #[serde(rename = "maxBytes")]
    pub max_bytes: Option<u64>,
    #[serde(rename = "backupCount")]
    pub backup_count: Option<usize>,
    pub encoding: Option<String>,
    pub colorize: Option<bool>,
    pub compress: Option<bool>,
    pub handlers: Option<Vec<String>>,
    pub maxsize: Option<usize>,
}

impl HandlerSpec {
    /// A spec with only `class` set
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            level: None,
            formatter: None,
            stream: None,
            filename: None,
            mode: None,
            max_bytes: None,
            backup_count: None,
            encoding: None,
            colorize: None,
            compress: None,
            handlers: None,
            maxsize: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSpec {
    pub level: Option<String>,
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default = "default_true")]
    pub propagate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootSpec {
    pub level: Option<String>,
    #[serde(default)]
    pub handlers: Vec<String>,
}

impl LoggingConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| LoggerError::parse("YAML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| LoggerError::parse("JSON", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.yaml`, `.yml` or `.json` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logging configuration",
                path.display().to_string(),
                e,
            )
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(LoggerError::config(
                path.display().to_string(),
                "expected a .yaml, .yml or .json file",
            )),
        }
    }

    /// The bundled dicomjson configuration
    pub fn dicomjson() -> Result<Self> {
        Self::from_yaml_str(DICOMJSON_CONFIG_YAML)
    }

    /// Load the file named by [`CONFIG_ENV_VAR`], falling back to
    /// [`LoggingConfig::dicomjson`] when the variable is unset or empty
    pub fn from_env_or_default() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_path(PathBuf::from(path)),
            _ => Self::dicomjson(),
        }
    }

    /// Re-root every relative handler `filename` under `dir`
    pub fn rebase_filenames(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        for spec in self.handlers.values_mut() {
            if let Some(ref mut filename) = spec.filename {
                if filename.is_relative() {
                    let relative = filename.strip_prefix(".").unwrap_or(filename.as_path());
                    *filename = dir.join(relative);
                }
            }
        }
    }

    /// Paths of every file destination, in handler name order
    pub fn file_destinations(&self) -> Vec<&Path> {
        self.handlers
            .values()
            .filter_map(|spec| spec.filename.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_document() {
        let config = LoggingConfig::dicomjson().unwrap();

        assert_eq!(config.version, 1);
        assert!(!config.disable_existing_loggers);
        assert_eq!(
            config.handlers.keys().collect::<Vec<_>>(),
            vec!["console", "file"]
        );

        let file = &config.handlers["file"];
        assert_eq!(file.class, "logging.handlers.RotatingFileHandler");
        assert_eq!(file.max_bytes, Some(10_485_760));
        assert_eq!(file.backup_count, Some(10));
        assert_eq!(file.filename.as_deref(), Some(Path::new("./dicomjson.log")));

        let root = config.root.as_ref().unwrap();
        assert_eq!(root.level.as_deref(), Some("DEBUG"));
        assert_eq!(root.handlers, vec!["console", "file"]);
    }

    #[test]
    fn test_json_document() {
        let config = LoggingConfig::from_json_str(
            r#"{
                "version": 1,
                "formatters": {"plain": {"format": "%(message)s"}},
                "handlers": {
                    "sink": {"class": "logging.NullHandler"},
                    "out": {"class": "StreamHandler", "formatter": "plain", "stream": "ext://sys.stdout"}
                },
                "root": {"level": "INFO", "handlers": ["out", "sink"]}
            }"#,
        )
        .unwrap();

        assert!(config.disable_existing_loggers);
        assert_eq!(config.handlers.len(), 2);
    }

    #[test]
    fn test_malformed_documents() {
        let err = LoggingConfig::from_yaml_str("version: [").unwrap_err();
        assert!(matches!(err, LoggerError::ConfigParse { ref format, .. } if format == "YAML"));

        let err = LoggingConfig::from_json_str("{\"version\": 1,").unwrap_err();
        assert!(matches!(err, LoggerError::ConfigParse { ref format, .. } if format == "JSON"));

        // Missing version
        assert!(LoggingConfig::from_yaml_str("handlers: {}").is_err());
    }

    #[test]
    fn test_unknown_handler_key_is_rejected() {
        let err = LoggingConfig::from_yaml_str(
            r#"
version: 1
handlers:
  sink:
    class: logging.NullHandler
    maxbytes: 10
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoggerError::ConfigParse { .. }));
    }

    #[test]
    fn test_rebase_filenames() {
        let mut config = LoggingConfig::dicomjson().unwrap();
        config.rebase_filenames("/var/log/dicomjson");

        assert_eq!(
            config.file_destinations(),
            vec![Path::new("/var/log/dicomjson/dicomjson.log")]
        );

        // Absolute paths are left alone
        config.rebase_filenames("/elsewhere");
        assert_eq!(
            config.file_destinations(),
            vec![Path::new("/var/log/dicomjson/dicomjson.log")]
        );
    }

    #[test]
    fn test_from_path_dispatches_on_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let yaml = dir.path().join("logging.yml");
        std::fs::write(&yaml, DICOMJSON_CONFIG_YAML).unwrap();
        assert!(LoggingConfig::from_path(&yaml).is_ok());

        let toml = dir.path().join("logging.toml");
        std::fs::write(&toml, "version = 1").unwrap();
        assert!(matches!(
            LoggingConfig::from_path(&toml),
            Err(LoggerError::InvalidConfiguration { .. })
        ));

        assert!(matches!(
            LoggingConfig::from_path(dir.path().join("absent.yaml")),
            Err(LoggerError::IoOperation { .. })
        ));
    }
}
