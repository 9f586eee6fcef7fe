//! HTTP error translation.
//!
//! Turns errors from the inner handler into JSON error responses. Declared
//! errors ([`HttpError`]) keep their status code, message and extra
//! properties unless their status code is blacklisted, in which case the
//! blacklist entry's message (and optionally status code) replaces them.
//! Undeclared errors always become `500 {"message":"InternalServerError"}`.
//!
//! # Response Format
//!
//! ```json
//! { "message": "Not found", "userId": 42 }
//! ```
//!
//! with `Content-Type: application/json`.
//!
//! # Example
//!
//! ```
//! use strata_core::{handler_fn, Context, Event, Handler, HttpError, Middleware, ProxyResult};
//! use strata_middleware::stages::http_error_handler;
//!
//! let handler = http_error_handler().wrap(
//!     handler_fn(|_event: Event, _ctx: Context| async move {
//!         Err::<ProxyResult, _>(HttpError::not_found("Not found").into())
//!     })
//!     .boxed(),
//! );
//!
//! # tokio_test::block_on(async {
//! let result = handler.call(Event::default(), Context::new()).await.unwrap();
//! assert_eq!(result.status_code, 404);
//! assert_eq!(result.body, Some(r#"{"message":"Not found"}"#.into()));
//! # });
//! ```

use crate::logger::{logger_from_deps, ErrorLogger, TracingLogger};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use strata_core::{
    handler_fn, Body, BoxHandler, Context, Error, Event, Extensions, Handler, Middleware,
    ProxyResult,
};

/// Message used for undeclared errors.
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";

/// A status code whose message must not reach callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistItem {
    /// Status code to match. `None` matches declared errors without one.
    pub status_code: Option<u16>,
    /// Message sent instead of the error's own.
    pub alternative_message: String,
    /// Status code sent instead of the matched one.
    pub alternative_status_code: Option<u16>,
}

impl BlacklistItem {
    /// Hides the message of errors with `status_code`.
    pub fn new(status_code: Option<u16>, alternative_message: impl Into<String>) -> Self {
        Self {
            status_code,
            alternative_message: alternative_message.into(),
            alternative_status_code: None,
        }
    }

    /// Also replaces the status code.
    pub fn with_alternative_status(mut self, status_code: u16) -> Self {
        self.alternative_status_code = Some(status_code);
        self
    }
}

/// The default blacklist: 500, 403, 401 and errors without a status code.
pub fn default_blacklist() -> Vec<BlacklistItem> {
    vec![
        BlacklistItem::new(Some(500), INTERNAL_SERVER_ERROR),
        BlacklistItem::new(Some(403), "Forbidden"),
        BlacklistItem::new(Some(401), "Unauthorized"),
        BlacklistItem::new(None, INTERNAL_SERVER_ERROR).with_alternative_status(500),
    ]
}

/// A plain logging callback.
pub type LogFn = Arc<dyn Fn(&Error) + Send + Sync>;

/// Configuration for [`HttpErrorHandler`].
#[derive(Clone)]
pub struct HttpErrorHandlerOptions {
    /// Status codes whose messages are replaced.
    pub blacklist: Vec<BlacklistItem>,
    /// Logger used when the event carries no `"logger"` dependency.
    pub logger: Option<Arc<dyn ErrorLogger>>,
    /// Callback used when no logger is available.
    pub log_error: Option<LogFn>,
}

impl Default for HttpErrorHandlerOptions {
    fn default() -> Self {
        Self {
            blacklist: default_blacklist(),
            logger: None,
            log_error: None,
        }
    }
}

impl fmt::Debug for HttpErrorHandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpErrorHandlerOptions")
            .field("blacklist", &self.blacklist)
            .field("logger", &self.logger.is_some())
            .field("log_error", &self.log_error.is_some())
            .finish()
    }
}

impl HttpErrorHandlerOptions {
    /// Status code and body for an error.
    pub fn safe_response(&self, error: &Error) -> (u16, Map<String, Value>) {
        let mut body = Map::new();

        let Some(declared) = error.declared() else {
            body.insert("message".into(), INTERNAL_SERVER_ERROR.into());
            return (500, body);
        };

        if let Some(item) = self
            .blacklist
            .iter()
            .find(|item| item.status_code == declared.status_code())
        {
            body.insert("message".into(), item.alternative_message.clone().into());
            let status = item
                .alternative_status_code
                .or(item.status_code)
                .unwrap_or(500);
            return (status, body);
        }

        body.insert("message".into(), declared.message().into());
        for (key, value) in declared.properties() {
            if key != "message" && key != "statusCode" {
                body.insert(key.clone(), value.clone());
            }
        }
        (declared.status_code().unwrap_or(500), body)
    }

    fn log(&self, extensions: &Extensions, error: &Error) {
        if let Some(logger) = logger_from_deps(extensions).or_else(|| self.logger.clone()) {
            logger.error(error);
        } else if let Some(log_error) = &self.log_error {
            log_error(error);
        } else {
            TracingLogger.error(error);
        }
    }
}

/// Error translation middleware. See the [module docs](self).
#[derive(Debug, Clone, Default)]
pub struct HttpErrorHandler {
    options: Arc<HttpErrorHandlerOptions>,
}

/// Creates the error translation middleware with default options.
pub fn http_error_handler() -> HttpErrorHandler {
    HttpErrorHandler::default()
}

impl HttpErrorHandler {
    /// Creates the middleware from options.
    pub fn new(options: HttpErrorHandlerOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// The configured options.
    pub fn options(&self) -> &HttpErrorHandlerOptions {
        &self.options
    }
}

impl Middleware<ProxyResult> for HttpErrorHandler {
    fn name(&self) -> &'static str {
        "http_error_handler"
    }

    fn wrap(&self, inner: BoxHandler) -> BoxHandler {
        let options = Arc::clone(&self.options);
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            let options = Arc::clone(&options);
            async move {
                let extensions = event.extensions().clone();
                match inner.call(event, ctx).await {
                    Ok(result) => Ok(result),
                    Err(error) => {
                        options.log(&extensions, &error);
                        let (status_code, body) = options.safe_response(&error);
                        Ok(ProxyResult::new(status_code)
                            .with_header("Content-Type", "application/json")
                            .with_body(Body::Text(Value::Object(body).to_string())))
                    }
                }
            }
        })
        .boxed()
    }
}
