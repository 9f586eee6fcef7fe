//! # Strata Middleware
//!
//! Single-purpose middlewares for serverless handlers, composed with
//! [`strata_core::compose`].
//!
//! ## Typical HTTP Stack
//!
//! ```text
//! Event → SanitizeHeaders → Cors → HttpErrorHandler → SerializeJson → ParseJson → Handler
//!                                                                                    ↓
//! Result ← Cors headers ← error response ← encoded body ←─────────────────────────────┘
//! ```
//!
//! Middlewares enrich the event with typed extensions ([`SanitizedHeaders`],
//! [`JsonBody`], [`Deps`], ...) that later stages and the handler read with
//! [`Event::require`](strata_core::Event::require).
//!
//! ## Example
//!
//! ```
//! use strata_core::{compose, handler_fn, Context, Event, Handler, Middleware, ProxyResult};
//! use strata_middleware::stages::{
//!     cors, http_error_handler, parse_json, sanitize_headers, serialize_json, JsonBody,
//! };
//!
//! let handler = compose![
//!     sanitize_headers(),
//!     cors(),
//!     http_error_handler(),
//!     serialize_json(),
//!     parse_json(),
//! ]
//! .wrap(
//!     handler_fn(|event: Event, _ctx: Context| async move {
//!         let body = event.require::<JsonBody>()?.value().clone();
//!         Ok(ProxyResult::ok().with_body(body))
//!     })
//!     .boxed(),
//! );
//!
//! # tokio_test::block_on(async {
//! let event = Event::new(serde_json::json!({ "httpMethod": "POST", "body": "{\"a\":1}" }));
//! let result = handler.call(event, Context::new()).await.unwrap();
//! assert_eq!(result.body, Some(r#"{"a":1}"#.into()));
//! assert_eq!(result.header("Access-Control-Allow-Origin"), Some("*"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/strata-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod logger;
pub mod stages;

pub use logger::{logger_from_deps, ErrorLogger, TracingLogger, LOGGER_DEPENDENCY};
pub use stages::*;
