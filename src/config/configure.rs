//! Turning a validated configuration into live handlers

use super::{ConfigPlan, HandlerKind, HandlerPlan, LoggingConfig};
use crate::core::{handler::share, Formatter, LoggerError, Manager, Result, SharedHandler};
use crate::handlers::{
    FileHandler, NullHandler, QueueHandler, RotatingFileHandler, StreamHandler, StreamTarget,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Produces the writer a redirected stream handler writes to
pub type WriterFactory = Box<dyn Fn() -> Box<dyn Write + Send> + Send + Sync>;

/// Applies a [`LoggingConfig`] to a [`Manager`].
///
/// [`Manager::configure`] is shorthand for `Configurator::new(config).apply(manager)`.
/// The configurator additionally lets a caller replace `ext://sys.stdout`
/// or `ext://sys.stderr` with another writer:
///
/// ```
/// use dicomjson_logging::config::{Configurator, LoggingConfig};
/// use dicomjson_logging::handlers::StreamTarget;
/// use dicomjson_logging::Manager;
///
/// let mut config = LoggingConfig::dicomjson().unwrap();
/// let dir = tempfile::tempdir().unwrap();
/// config.rebase_filenames(dir.path());
///
/// let manager = Manager::new();
/// Configurator::new(&config)
///     .redirect_stream(StreamTarget::Stdout, || Box::new(std::io::sink()))
///     .apply(&manager)
///     .unwrap();
/// assert_eq!(manager.handler_names(), vec!["console", "file"]);
/// ```
pub struct Configurator<'a> {
    config: &'a LoggingConfig,
    redirects: HashMap<StreamTarget, WriterFactory>,
}

impl<'a> Configurator<'a> {
    pub fn new(config: &'a LoggingConfig) -> Self {
        Self {
            config,
            redirects: HashMap::new(),
        }
    }

    #[must_use]
    pub fn redirect_stream<F>(mut self, target: StreamTarget, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Write + Send> + Send + Sync + 'static,
    {
        self.redirects.insert(target, Box::new(factory));
        self
    }

    /// Validate, close the manager's previous handlers, build the new ones
    /// and attach them.
    ///
    /// Nothing is touched when validation fails. If a destination cannot be
    /// opened the previous handlers are already closed and the handlers
    /// built so far are dropped, leaving loggers without configured handlers.
    pub fn apply(&self, manager: &Manager) -> Result<()> {
        let plan = self.config.validate()?;
        manager.close_handlers();
        let built = self.build(&plan)?;
        manager.install(&plan, built);
        Ok(())
    }

    /// Construct every handler of `plan` in build order
    pub fn build(&self, plan: &ConfigPlan) -> Result<Vec<(String, SharedHandler)>> {
        let mut built: Vec<(String, SharedHandler)> = Vec::with_capacity(plan.handlers.len());
        for handler_plan in &plan.handlers {
            let handler = self.build_one(handler_plan, &built)?;
            built.push((handler_plan.name.clone(), handler));
        }
        Ok(built)
    }

    fn build_one(&self, plan: &HandlerPlan, built: &[(String, SharedHandler)]) -> Result<SharedHandler> {
        let formatter: Arc<Formatter> = plan.formatter.clone().unwrap_or_default();

        let handler = match plan.kind {
            HandlerKind::Stream { target, colorize } => {
                let handler = match self.redirects.get(&target) {
                    Some(factory) => StreamHandler::with_writer(factory()),
                    None => StreamHandler::new(target),
                };
                share(
                    handler
                        .with_name(&plan.name)
                        .with_level(plan.level)
                        .with_formatter(formatter)
                        .with_colors(colorize),
                )
            }
            HandlerKind::File { ref path, mode } => share(
                FileHandler::open(path, mode)?
                    .with_name(&plan.name)
                    .with_level(plan.level)
                    .with_formatter(formatter),
            ),
            HandlerKind::RotatingFile {
                ref path,
                mode,
                ref policy,
            } => share(
                RotatingFileHandler::open(path, policy.clone(), mode)?
                    .with_name(&plan.name)
                    .with_level(plan.level)
                    .with_formatter(formatter),
            ),
            HandlerKind::Queue {
                ref targets,
                maxsize,
            } => {
                let resolved = targets
                    .iter()
                    .map(|target| {
                        built
                            .iter()
                            .find(|(name, _)| name == target)
                            .map(|(_, h)| Arc::clone(h))
                            .ok_or_else(|| LoggerError::unknown_handler(format!("handler '{}'", plan.name), target))
                    })
                    .collect::<Result<Vec<_>>>()?;
                share(
                    QueueHandler::spawn(resolved, maxsize)?
                        .with_name(&plan.name)
                        .with_level(plan.level),
                )
            }
            HandlerKind::Null => share(NullHandler::new().with_name(&plan.name).with_level(plan.level)),
        };

        Ok(handler)
    }
}
