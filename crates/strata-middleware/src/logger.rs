//! Error loggers.
//!
//! Stages that swallow errors (error translation, batch iteration in collect
//! mode) report them through an [`ErrorLogger`]. A logger registered as the
//! `"logger"` dependency (an `Arc<dyn ErrorLogger>`) takes precedence over
//! any configured one; without either, errors go to `tracing`.

use crate::stages::inject::Deps;
use std::sync::Arc;
use strata_core::{Error, Extensions};

/// Name of the dependency that overrides configured loggers.
pub const LOGGER_DEPENDENCY: &str = "logger";

/// A sink for errors that a stage handles instead of propagating.
pub trait ErrorLogger: Send + Sync + 'static {
    /// Reports one error.
    fn error(&self, error: &Error);
}

/// Logs errors as `tracing` events at `ERROR` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ErrorLogger for TracingLogger {
    fn error(&self, error: &Error) {
        match error.declared() {
            Some(declared) => tracing::error!(
                status_code = declared.status_code(),
                error = %error,
                "handler failed"
            ),
            None => tracing::error!(error = %error, "handler failed"),
        }
    }
}

/// Returns the logger registered in an event's dependencies, if any.
///
/// A logger dependency that fails to build is reported and ignored.
pub fn logger_from_deps(extensions: &Extensions) -> Option<Arc<dyn ErrorLogger>> {
    let deps = extensions.get::<Deps>()?;
    match deps.get::<Arc<dyn ErrorLogger>>(LOGGER_DEPENDENCY) {
        Ok(logger) => logger.map(|logger| Arc::clone(&*logger)),
        Err(error) => {
            tracing::warn!(%error, "logger dependency could not be resolved");
            None
        }
    }
}
