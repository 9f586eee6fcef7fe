//! Typed configuration for Strata middlewares.
//!
//! This crate loads the settings of the configurable middlewares from TOML
//! or JSON files and environment variables:
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//! - Conversion of every section into its middleware options
//!
//! # Overview
//!
//! [`StrataConfig`] holds one section per concern:
//!
//! - [`CorsSection`] - allowed origins, headers and methods
//! - [`ErrorHandlerSection`] - the status code blacklist
//! - [`BatchSection`] - record iteration mode
//! - [`XsrfSection`] - the token header name
//! - [`LogConfig`](strata_telemetry::LogConfig) - logging setup
//!
//! # Example
//!
//! ```no_run
//! use strata_config::ConfigLoader;
//! use strata_middleware::stages::{BatchOptions, Cors, CorsOptions};
//!
//! # fn main() -> Result<(), strata_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("strata.toml")?
//!     .with_env_prefix("STRATA")
//!     .load()?;
//!
//! let cors = Cors::new(CorsOptions::from(&config.cors));
//! let batch = BatchOptions::from(&config.batch);
//! # let _ = (cors, batch);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [cors]
//! origin = ["https://app.example.com"]
//! credentials = true
//! methods = ["GET", "POST"]
//! max_age_secs = 600
//!
//! [[error_handler.blacklist]]
//! status_code = 500
//! alternative_message = "Internal Server Error"
//!
//! [batch]
//! batch_item_failures = true
//! sequential = false
//!
//! [xsrf]
//! header_name = "x-xsrf-token"
//!
//! [logging]
//! level = "info"
//! json_format = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `STRATA__CORS__ORIGIN=https://a.example,https://b.example`
//! - `STRATA__BATCH__BATCH_ITEM_FAILURES=true`
//! - `STRATA__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
