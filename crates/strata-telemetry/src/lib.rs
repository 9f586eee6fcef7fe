//! Structured logging for Strata handlers.
//!
//! Every Strata crate reports through `tracing` macros. This crate installs
//! the subscriber that turns those events into output: JSON lines for
//! production (what log aggregators of serverless platforms expect) or a
//! pretty, human-readable format for local development.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(request_id = "c0ffee", "handling event");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
