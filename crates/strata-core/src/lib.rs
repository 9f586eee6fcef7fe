//! # Strata Core
//!
//! Core types and traits for composing serverless handlers.
//!
//! This crate provides the foundational types used throughout Strata:
//!
//! - [`Event`] - The platform payload plus typed enrichments
//! - [`Context`] - Invocation metadata forwarded to every stage
//! - [`Handler`] - The async function contract every stage satisfies
//! - [`Middleware`] - A transform from an inner handler to an outer one
//! - [`compose()`] - Folds middlewares into one, exposing the terminal handler
//! - [`di`] - The lazy, cycle-detecting dependency container
//! - [`Error`] / [`HttpError`] - Undeclared and declared failures
//! - [`ProxyResult`] / [`BatchResponse`] - What handlers return

#![doc(html_root_url = "https://docs.rs/strata-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compose;
mod context;
pub mod di;
mod error;
mod event;
mod handler;
mod middleware;
mod response;

pub use compose::{compose, Composed};
pub use context::Context;
pub use di::{Container, Dependencies, Service};
pub use error::{Error, HttpError, Result};
pub use event::{Event, Extensions};
pub use handler::{handler_fn, BoxFuture, BoxHandler, FnHandler, Handler};
pub use middleware::{BoxMiddleware, FnMiddleware, Middleware, MiddlewareExt, Then};
pub use response::{BatchItemFailure, BatchResponse, Body, Headers, ProxyResult};
