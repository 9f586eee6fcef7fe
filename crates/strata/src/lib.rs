//! # Strata
//!
//! **Composable middleware for serverless handlers**
//!
//! Strata builds a handler for a function-as-a-service platform out of small
//! middlewares, each of which wraps the next:
//!
//! - **Composition** – `compose!` folds middlewares into one, and the terminal
//!   handler stays reachable through [`Handler::actual`](prelude::Handler::actual)
//! - **Dependency injection** – a lazy container that resolves each service
//!   once and reports dependency cycles
//! - **HTTP stages** – header sanitizing, cookies, JSON bodies, CORS, error
//!   translation, JWT and XSRF verification, parameter decoding and routing
//! - **Batch records** – per-record invocation with partial failure reports
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let hello = handler_fn(|event: Event, _ctx: Context| async move {
//!     let name = event.get::<JsonBody>().and_then(|body| body.0["name"].as_str().map(String::from));
//!     Ok::<_, Error>(ProxyResult::ok().with_body(serde_json::json!({ "hello": name })))
//! });
//!
//! let handler = compose![
//!     sanitize_headers(),
//!     cors(),
//!     http_error_handler(),
//!     serialize_json(),
//!     parse_json(),
//! ]
//! .wrap(hello.boxed());
//!
//! let event = Event::new(serde_json::json!({
//!     "httpMethod": "POST",
//!     "path": "/",
//!     "headers": { "Content-Type": "application/json" },
//!     "body": "{\"name\":\"strata\"}",
//! }));
//! let result = handler.call(event, Context::new()).await?;
//! assert_eq!(result.status_code, 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layering
//!
//! ```text
//! Event → sanitize_headers → cors → http_error_handler → … → handler
//!                                                             ↓
//! ProxyResult ← sanitize_headers ← cors ← http_error_handler ←┘
//! ```

#![doc(html_root_url = "https://docs.rs/strata/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use strata_core as core;

// Re-export middleware stages
pub use strata_middleware as middleware;

// Re-export configuration
pub use strata_config as config;

// Re-export logging setup
pub use strata_telemetry as telemetry;

pub use strata_core::compose;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use strata::prelude::*;
///
/// let container = Dependencies::new().provide_value("greeting", "hi").build();
/// assert!(container.contains("greeting"));
/// ```
pub mod prelude {
    pub use strata_core::{
        compose, handler_fn, BatchItemFailure, BatchResponse, Body, BoxHandler, Container,
        Context, Dependencies, Error, Event, Handler, Headers, HttpError, Middleware,
        MiddlewareExt, ProxyResult, Result,
    };

    // Re-export middleware stages
    pub use strata_middleware::stages::{
        cors, decode_parameters, for_each_record, http_error_handler, inject, parse_cookie,
        parse_json, routes, sanitize_headers, serialize_json, verify_jwt, verify_xsrf_token,
        BatchOptions, BatchRecord, Cookies, Cors, CorsOptions, DecodedParameters, Deps,
        HttpErrorHandler, HttpErrorHandlerOptions, JsonBody, JwtOptions, RouteParams, Routes,
        SanitizedHeaders, User, XsrfOptions, XsrfTokens,
    };

    // Re-export error loggers
    pub use strata_middleware::{ErrorLogger, TracingLogger};

    // Re-export configuration
    pub use strata_config::{ConfigError, ConfigLoader, StrataConfig};

    // Re-export logging setup
    pub use strata_telemetry::{init_logging, LogConfig};
}
