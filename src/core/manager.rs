//! Logger registry and configuration entry point
//!
//! A [`Manager`] owns the root logger, every named logger handed out by
//! [`Manager::get_logger`], and the handlers built from the last applied
//! [`LoggingConfig`]. A process-wide manager is available through
//! [`manager()`] and the free functions next to it.

use super::{
    error::Result,
    handler::{self, SharedHandler},
    logger::{Logger, ROOT_LOGGER_NAME},
    metrics::LoggerMetrics,
};
use crate::config::{ConfigPlan, Configurator, LoggerPlan, LoggingConfig};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

pub struct Manager {
    root: Arc<Logger>,
    loggers: RwLock<BTreeMap<String, Arc<Logger>>>,
    /// Configured handlers in build order
    handlers: RwLock<Vec<(String, SharedHandler)>>,
    metrics: Arc<LoggerMetrics>,
}

impl Manager {
    #[must_use]
    pub fn new() -> Self {
        let metrics = Arc::new(LoggerMetrics::new());
        Self {
            root: Arc::new(Logger::root(Arc::clone(&metrics))),
            loggers: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(Vec::new()),
            metrics,
        }
    }

    /// Build a manager and apply `config` to it
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let manager = Self::new();
        manager.configure(config)?;
        Ok(manager)
    }

    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Return the logger called `name`, creating it and any missing dotted
    /// ancestors on first use. `""` and `"root"` name the root logger.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return self.root();
        }
        if let Some(existing) = self.loggers.read().get(name) {
            existing.mark_requested();
            return Arc::clone(existing);
        }
        let mut loggers = self.loggers.write();
        let logger = self.get_or_create(&mut loggers, name);
        logger.mark_requested();
        logger
    }

    /// Ancestors created here only link the hierarchy and are left out of
    /// `disable_existing_loggers` until someone asks for them by name.
    fn get_or_create(&self, loggers: &mut BTreeMap<String, Arc<Logger>>, name: &str) -> Arc<Logger> {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return self.root();
        }
        if let Some(existing) = loggers.get(name) {
            return Arc::clone(existing);
        }

        let parent = match name.rfind('.') {
            Some(idx) => self.get_or_create(loggers, &name[..idx]),
            None => self.root(),
        };
        let logger = Arc::new(Logger::child(name, parent));
        loggers.insert(name.to_string(), Arc::clone(&logger));
        logger
    }

    /// Names of every named logger created so far (root excluded)
    pub fn logger_names(&self) -> Vec<String> {
        self.loggers.read().keys().cloned().collect()
    }

    /// A handler built from the current configuration
    pub fn handler(&self, name: &str) -> Option<SharedHandler> {
        self.handlers
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| Arc::clone(h))
    }

    /// Names of the configured handlers in build order
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.read().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Validate `config`, replace the current handlers and apply the
    /// logger settings. See [`Configurator`] for stream redirection.
    pub fn configure(&self, config: &LoggingConfig) -> Result<()> {
        Configurator::new(config).apply(self)
    }

    /// Close every configured handler, newest first, and detach it from all
    /// loggers. Queues are built after their targets, so they drain first.
    pub(crate) fn close_handlers(&self) {
        let closed: Vec<SharedHandler> = std::mem::take(&mut *self.handlers.write())
            .into_iter()
            .rev()
            .map(|(_, h)| h)
            .collect();
        if closed.is_empty() {
            return;
        }

        for logger in self.all_loggers() {
            let kept = logger
                .handlers()
                .into_iter()
                .filter(|h| !closed.iter().any(|c| Arc::ptr_eq(c, h)))
                .collect();
            logger.replace_handlers(kept);
        }

        for shared in &closed {
            let mut guard = shared.lock();
            if let Err(e) = guard.close() {
                eprintln!(
                    "[LOGGER ERROR] Failed to close handler '{}': {}",
                    guard.name(),
                    e
                );
            }
        }
    }

    /// Attach freshly built handlers according to `plan`
    pub(crate) fn install(&self, plan: &ConfigPlan, built: Vec<(String, SharedHandler)>) {
        let resolve = |names: &[String]| -> Vec<SharedHandler> {
            names
                .iter()
                .filter_map(|n| built.iter().find(|(b, _)| b == n).map(|(_, h)| Arc::clone(h)))
                .collect()
        };
        let apply = |logger: &Logger, logger_plan: &LoggerPlan| {
            if let Some(level) = logger_plan.level {
                logger.set_level(level);
            }
            logger.replace_handlers(resolve(&logger_plan.handlers));
            logger.set_disabled(false);
        };

        if let Some(ref root_plan) = plan.root {
            apply(&self.root, root_plan);
        }

        let mut loggers = self.loggers.write();
        let existing: Vec<(String, Arc<Logger>)> = loggers
            .iter()
            .filter(|(_, logger)| logger.is_requested())
            .map(|(name, logger)| (name.clone(), Arc::clone(logger)))
            .collect();

        for logger_plan in &plan.loggers {
            let logger = self.get_or_create(&mut loggers, &logger_plan.name);
            logger.mark_requested();
            apply(&logger, logger_plan);
            logger.set_propagate(logger_plan.propagate);
        }

        for (name, logger) in existing {
            if plan.loggers.iter().any(|p| p.name == name) {
                continue;
            }
            let under_configured = plan.loggers.iter().any(|p| {
                name.strip_prefix(p.name.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            });
            if under_configured {
                logger.set_level(None);
                logger.replace_handlers(Vec::new());
                logger.set_propagate(true);
                logger.set_disabled(false);
            } else {
                logger.set_disabled(plan.disable_existing_loggers);
            }
        }
        drop(loggers);

        *self.handlers.write() = built;
    }

    fn all_loggers(&self) -> Vec<Arc<Logger>> {
        let mut all = vec![self.root()];
        all.extend(self.loggers.read().values().cloned());
        all
    }

    /// Flush every configured handler
    pub fn flush(&self) -> Result<()> {
        for (_, shared) in self.handlers.read().iter() {
            handler::flush_isolated(shared)?;
        }
        Ok(())
    }

    /// Flush and close every configured handler. Loggers stay usable; with
    /// no handlers left they fall back to stderr for WARNING and above.
    pub fn shutdown(&self) {
        if let Err(e) = self.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }
        self.close_handlers();
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

static GLOBAL: OnceLock<Manager> = OnceLock::new();

/// The process-wide manager
pub fn manager() -> &'static Manager {
    GLOBAL.get_or_init(Manager::new)
}

/// Configure the process-wide manager
///
/// The process-wide manager is never dropped. Call [`shutdown`] before the
/// program exits, or records still waiting in a `QueueHandler` are lost.
pub fn init(config: &LoggingConfig) -> Result<()> {
    manager().configure(config)
}

/// Configure the process-wide manager from `DICOMJSON_LOG_CONFIG`, or the
/// bundled dicomjson document when the variable is unset
///
/// As with [`init`], pair this with a call to [`shutdown`] before exit.
pub fn init_default() -> Result<()> {
    init(&LoggingConfig::from_env_or_default()?)
}

pub fn root() -> Arc<Logger> {
    manager().root()
}

pub fn get_logger(name: &str) -> Arc<Logger> {
    manager().get_logger(name)
}

/// Flush and close the process-wide handlers
pub fn shutdown() {
    manager().shutdown();
}
