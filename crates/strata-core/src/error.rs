//! Error types for Strata.
//!
//! Errors fall into two families:
//!
//! - **Declared** errors are [`HttpError`] values. They carry an optional
//!   status code, a message and optional extra properties, and may be shown
//!   to callers (subject to the blacklist of the error-translation
//!   middleware).
//! - **Undeclared** errors are everything else: parse failures, circular
//!   dependencies, arbitrary [`anyhow::Error`] values. They are never
//!   exposed to callers verbatim.
//!
//! An `HttpError` wrapped inside an `anyhow::Error` still counts as declared,
//! see [`Error::declared`].

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A declared application error.
///
/// # Example
///
/// ```
/// use strata_core::HttpError;
///
/// let err = HttpError::not_found("user 42 does not exist").with_property("userId", 42);
/// assert_eq!(err.status_code(), Some(404));
/// assert_eq!(err.message(), "user 42 does not exist");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HttpError {
    status_code: Option<u16>,
    message: String,
    properties: Map<String, Value>,
}

impl HttpError {
    /// Creates a declared error with a status code.
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
            properties: Map::new(),
        }
    }

    /// Creates a declared error that carries no status code.
    pub fn without_status(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            properties: Map::new(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 401 Unauthorized with the standard message.
    ///
    /// Authentication middlewares return exactly this error for every
    /// failure, whatever the cause.
    pub fn unauthorized() -> Self {
        Self::new(401, "User is not authorized")
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 500 Internal Server Error.
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Attaches an extra property that is serialized next to `message`.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the status code, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the extra properties.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}

/// Standard error type for Strata pipelines.
#[derive(Error, Debug)]
pub enum Error {
    /// A declared application error.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A dependency resolution chain revisited a name still being resolved.
    #[error("Circular dependency detected {}", display_chain(.chain))]
    CircularDependency {
        /// Names in resolution order, ending with the repeated name.
        chain: Vec<String>,
    },

    /// A resolved dependency does not have the requested type.
    #[error("dependency \"{name}\" is not a {expected}")]
    DependencyType {
        /// The dependency name.
        name: String,
        /// The requested type.
        expected: &'static str,
    },

    /// A required dependency has no factory.
    #[error("dependency \"{name}\" is not declared")]
    MissingDependency {
        /// The dependency name.
        name: String,
    },

    /// An event enrichment required by a middleware is absent.
    #[error("event is missing required extension {type_name}")]
    MissingExtension {
        /// Type name of the missing extension.
        type_name: &'static str,
    },

    /// JSON parsing or serialization failed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A cookie header could not be parsed.
    #[error("invalid cookie header: {message}")]
    Cookie {
        /// What was wrong with the header.
        message: String,
    },

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wraps an arbitrary error as an undeclared failure.
    pub fn other(error: impl Into<anyhow::Error>) -> Self {
        Self::Other(error.into())
    }

    /// Returns the declared error, if this is one.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_core::{Error, HttpError};
    ///
    /// let wrapped = Error::other(anyhow::Error::new(HttpError::forbidden("no")));
    /// assert_eq!(wrapped.declared().and_then(HttpError::status_code), Some(403));
    ///
    /// let plain = Error::other(anyhow::anyhow!("boom"));
    /// assert!(plain.declared().is_none());
    /// ```
    pub fn declared(&self) -> Option<&HttpError> {
        match self {
            Self::Http(error) => Some(error),
            Self::Other(error) => error.downcast_ref::<HttpError>(),
            _ => None,
        }
    }
}

fn display_chain(chain: &[String]) -> String {
    chain
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(" -> ")
}
