//! Validation of a [`LoggingConfig`] into a buildable [`ConfigPlan`]

use super::{HandlerSpec, LoggingConfig};
use crate::core::{Formatter, LogLevel, LoggerError, Result, DEFAULT_TEMPLATE};
use crate::handlers::{FileMode, RotationPolicy, StreamTarget};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const SUPPORTED_VERSION: u32 = 1;

/// A validated configuration: formatters compiled, references resolved,
/// handler parameters typed
#[derive(Debug, Clone)]
pub struct ConfigPlan {
    pub disable_existing_loggers: bool,
    pub formatters: BTreeMap<String, Arc<Formatter>>,
    /// Handlers in build order: queue handlers come after their targets
    pub handlers: Vec<HandlerPlan>,
    pub root: Option<LoggerPlan>,
    pub loggers: Vec<LoggerPlan>,
}

impl ConfigPlan {
    pub fn handler(&self, name: &str) -> Option<&HandlerPlan> {
        self.handlers.iter().find(|h| h.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct HandlerPlan {
    pub name: String,
    pub level: Option<LogLevel>,
    /// Always present for stream and file handlers
    pub formatter: Option<Arc<Formatter>>,
    pub kind: HandlerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    Stream {
        target: StreamTarget,
        colorize: bool,
    },
    File {
        path: PathBuf,
        mode: FileMode,
    },
    RotatingFile {
        path: PathBuf,
        mode: FileMode,
        policy: RotationPolicy,
    },
    Queue {
        targets: Vec<String>,
        maxsize: usize,
    },
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerPlan {
    pub name: String,
    /// `None` leaves the logger's level untouched; `Some(None)` is NOTSET
    pub level: Option<Option<LogLevel>>,
    pub handlers: Vec<String>,
    pub propagate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Stream,
    File,
    RotatingFile,
    Queue,
    Null,
}

impl Class {
    fn parse(class: &str) -> Option<Self> {
        match class {
            "logging.StreamHandler" | "StreamHandler" => Some(Class::Stream),
            "logging.FileHandler" | "FileHandler" => Some(Class::File),
            "logging.handlers.RotatingFileHandler" | "RotatingFileHandler" => {
                Some(Class::RotatingFile)
            }
            "logging.handlers.QueueHandler" | "QueueHandler" => Some(Class::Queue),
            "logging.NullHandler" | "NullHandler" => Some(Class::Null),
            _ => None,
        }
    }

    fn writes_text(self) -> bool {
        matches!(self, Class::Stream | Class::File | Class::RotatingFile)
    }

    fn accepted_keys(self) -> &'static [&'static str] {
        match self {
            Class::Stream => &["stream", "colorize"],
            Class::File => &["filename", "mode", "encoding"],
            Class::RotatingFile => &[
                "filename",
                "mode",
                "encoding",
                "maxBytes",
                "backupCount",
                "compress",
            ],
            Class::Queue => &["handlers", "maxsize"],
            Class::Null => &[],
        }
    }
}

fn present_keys(spec: &HandlerSpec) -> [(&'static str, bool); 10] {
    [
        ("stream", spec.stream.is_some()),
        ("filename", spec.filename.is_some()),
        ("mode", spec.mode.is_some()),
        ("maxBytes", spec.max_bytes.is_some()),
        ("backupCount", spec.backup_count.is_some()),
        ("encoding", spec.encoding.is_some()),
        ("colorize", spec.colorize.is_some()),
        ("compress", spec.compress.is_some()),
        ("handlers", spec.handlers.is_some()),
        ("maxsize", spec.maxsize.is_some()),
    ]
}

const UTF8_SPELLINGS: [&str; 3] = ["utf-8", "utf8", "utf_8"];

fn is_utf8(encoding: &str) -> bool {
    UTF8_SPELLINGS
        .iter()
        .any(|spelling| encoding.eq_ignore_ascii_case(spelling))
}

fn parse_level(owner: &str, level: Option<&str>) -> Result<Option<Option<LogLevel>>> {
    level
        .map(|name| LogLevel::parse_threshold(name).map_err(|_| LoggerError::invalid_level(owner, name)))
        .transpose()
}

impl LoggingConfig {
    /// Check every reference and parameter and compile the formatters
    ///
    /// # Errors
    ///
    /// Returns the first problem found. Formatters are checked first, then
    /// handlers, the root logger and named loggers, each in name order.
    pub fn validate(&self) -> Result<ConfigPlan> {
        if self.version != SUPPORTED_VERSION {
            return Err(LoggerError::UnsupportedVersion {
                found: self.version,
                expected: SUPPORTED_VERSION,
            });
        }

        let formatters = self.compile_formatters()?;

        let mut classes = BTreeMap::new();
        for (name, spec) in &self.handlers {
            let class = Class::parse(&spec.class).ok_or_else(|| {
                LoggerError::UnsupportedHandlerClass {
                    handler: name.clone(),
                    class: spec.class.clone(),
                }
            })?;
            classes.insert(name.as_str(), class);
        }

        let mut handlers = Vec::with_capacity(self.handlers.len());
        for (name, spec) in &self.handlers {
            handlers.push(self.plan_handler(name, spec, classes[name.as_str()], &formatters, &classes)?);
        }
        // Stable: name order within each group
        handlers.sort_by_key(|h| matches!(h.kind, HandlerKind::Queue { .. }));

        let root = match self.root {
            Some(ref spec) => Some(self.plan_logger(
                "root",
                "root logger",
                spec.level.as_deref(),
                &spec.handlers,
                false,
            )?),
            None => None,
        };

        let mut loggers = Vec::with_capacity(self.loggers.len());
        for (name, spec) in &self.loggers {
            loggers.push(self.plan_logger(
                name,
                &format!("logger '{}'", name),
                spec.level.as_deref(),
                &spec.handlers,
                spec.propagate,
            )?);
        }

        Ok(ConfigPlan {
            disable_existing_loggers: self.disable_existing_loggers,
            formatters,
            handlers,
            root,
            loggers,
        })
    }

    fn compile_formatters(&self) -> Result<BTreeMap<String, Arc<Formatter>>> {
        let mut compiled = BTreeMap::new();
        for (name, spec) in &self.formatters {
            if let Some(ref style) = spec.style {
                if style != "%" {
                    return Err(LoggerError::config(
                        format!("formatter '{}'", name),
                        format!("style '{}' is not supported, use '%'", style),
                    ));
                }
            }

            let template = spec.format.as_deref().unwrap_or(DEFAULT_TEMPLATE);
            let formatter = Formatter::new(template, spec.datefmt.as_deref()).map_err(|e| match e {
                LoggerError::FormatterError { template, message } => LoggerError::formatter(
                    template,
                    format!("{} (formatter '{}')", message, name),
                ),
                other => other,
            })?;
            compiled.insert(name.clone(), Arc::new(formatter));
        }
        Ok(compiled)
    }

    fn plan_handler(
        &self,
        name: &str,
        spec: &HandlerSpec,
        class: Class,
        formatters: &BTreeMap<String, Arc<Formatter>>,
        classes: &BTreeMap<&str, Class>,
    ) -> Result<HandlerPlan> {
        let owner = format!("handler '{}'", name);

        let level = parse_level(&owner, spec.level.as_deref())?.flatten();

        let formatter = match spec.formatter {
            Some(ref reference) => Some(Arc::clone(
                formatters
                    .get(reference)
                    .ok_or_else(|| LoggerError::unknown_formatter(name, reference))?,
            )),
            None if class.writes_text() => return Err(LoggerError::missing_formatter(name)),
            None => None,
        };

        let accepted = class.accepted_keys();
        if let Some((key, _)) = present_keys(spec)
            .into_iter()
            .find(|(key, set)| *set && !accepted.contains(key))
        {
            return Err(LoggerError::config(
                owner,
                format!("key '{}' is not accepted by {}", key, spec.class),
            ));
        }

        if let Some(ref encoding) = spec.encoding {
            if !is_utf8(encoding) {
                return Err(LoggerError::config(
                    owner,
                    format!("encoding '{}' is not supported, only UTF-8 is written", encoding),
                ));
            }
        }

        let mode = match spec.mode.as_deref() {
            Some(raw) => FileMode::parse(raw).ok_or_else(|| {
                LoggerError::config(&owner, format!("mode '{}' must be 'a' or 'w'", raw))
            })?,
            None => FileMode::default(),
        };

        let require_filename = || {
            spec.filename
                .clone()
                .ok_or_else(|| LoggerError::missing_field(name, "filename"))
        };

        let kind = match class {
            Class::Stream => {
                let raw = spec.stream.as_deref().unwrap_or("ext://sys.stderr");
                let target = StreamTarget::parse(raw).ok_or_else(|| {
                    LoggerError::config(
                        &owner,
                        format!(
                            "stream '{}' must be ext://sys.stdout or ext://sys.stderr",
                            raw
                        ),
                    )
                })?;
                HandlerKind::Stream {
                    target,
                    colorize: spec.colorize.unwrap_or(false),
                }
            }
            Class::File => HandlerKind::File {
                path: require_filename()?,
                mode,
            },
            Class::RotatingFile => {
                let path = require_filename()?;
                let max_bytes = spec
                    .max_bytes
                    .ok_or_else(|| LoggerError::missing_field(name, "maxBytes"))?;
                let backup_count = spec
                    .backup_count
                    .ok_or_else(|| LoggerError::missing_field(name, "backupCount"))?;
                HandlerKind::RotatingFile {
                    path,
                    mode,
                    policy: RotationPolicy::new()
                        .with_max_bytes(max_bytes)
                        .with_backup_count(backup_count)
                        .with_compression(spec.compress.unwrap_or(false)),
                }
            }
            Class::Queue => {
                let targets = match spec.handlers {
                    Some(ref targets) if !targets.is_empty() => targets.clone(),
                    _ => return Err(LoggerError::missing_field(name, "handlers")),
                };
                for target in &targets {
                    match classes.get(target.as_str()) {
                        None => return Err(LoggerError::unknown_handler(&owner, target)),
                        Some(_) if target == name => {
                            return Err(LoggerError::config(owner, "a queue cannot target itself"))
                        }
                        Some(Class::Queue) => {
                            return Err(LoggerError::config(
                                owner,
                                format!("target '{}' is itself a queue handler", target),
                            ))
                        }
                        Some(_) => {}
                    }
                }
                HandlerKind::Queue {
                    targets,
                    maxsize: spec.maxsize.unwrap_or(0),
                }
            }
            Class::Null => HandlerKind::Null,
        };

        Ok(HandlerPlan {
            name: name.to_string(),
            level,
            formatter,
            kind,
        })
    }

    fn plan_logger(
        &self,
        name: &str,
        owner: &str,
        level: Option<&str>,
        handlers: &[String],
        propagate: bool,
    ) -> Result<LoggerPlan> {
        let level = parse_level(owner, level)?;

        for handler in handlers {
            if !self.handlers.contains_key(handler) {
                return Err(LoggerError::unknown_handler(owner, handler));
            }
        }

        Ok(LoggerPlan {
            name: name.to_string(),
            level,
            handlers: handlers.to_vec(),
            propagate,
        })
    }
}
