//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Answers preflight `OPTIONS` requests directly and adds the
//! `Access-Control-Allow-Origin` and `Access-Control-Allow-Credentials`
//! headers to every other response.
//!
//! Requires [`SanitizedHeaders`], so place it inside `sanitize_headers`.
//! Errors from the inner handler propagate unchanged; to decorate error
//! responses as well, compose the error handler inside this middleware:
//!
//! ```text
//! sanitize_headers → cors → http_error_handler → handler
//! ```
//!
//! ## CORS Headers
//!
//! - `Access-Control-Allow-Origin`: the configured literal, the request
//!   origin when echoing or when it is listed, or `null`
//! - `Access-Control-Allow-Credentials`: `true` or `false`
//! - `Access-Control-Allow-Headers`: preflight only, omitted when empty
//! - `Access-Control-Allow-Methods`: preflight only, omitted when empty
//! - `Access-Control-Allow-Max-Age`: preflight only, when configured
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use strata_middleware::stages::Cors;
//!
//! let cors = Cors::builder()
//!     .allow_origins(["https://app.example.com", "https://admin.example.com"])
//!     .allow_headers(["Content-Type", "Authorization"])
//!     .max_age(Duration::from_secs(600))
//!     .build();
//! ```

use crate::stages::headers::SanitizedHeaders;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    handler_fn, BoxHandler, Context, Event, Handler, Headers, Middleware, ProxyResult,
};

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
    /// `Access-Control-Allow-Max-Age` header.
    pub const ALLOW_MAX_AGE: &str = "Access-Control-Allow-Max-Age";
    /// `Access-Control-Request-Headers` request header (preflight), lower case.
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
    /// `Origin` request header, lower case.
    pub const ORIGIN: &str = "origin";
}

/// Value sent when the request origin is not allowed.
pub const NULL_ORIGIN: &str = "null";

/// Which origin to allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigin {
    /// Always send this value (`*` by default).
    Literal(String),
    /// Echo the request's `Origin` header.
    Echo,
    /// Echo the request's `Origin` header only if it is listed.
    List(Vec<String>),
}

impl AllowedOrigin {
    /// The `Access-Control-Allow-Origin` value for a request origin.
    pub fn header_value(&self, request_origin: Option<&str>) -> String {
        let allowed = match self {
            Self::Literal(value) => return value.clone(),
            Self::Echo => request_origin,
            Self::List(origins) => {
                request_origin.filter(|origin| origins.iter().any(|allowed| allowed == origin))
            }
        };
        allowed.unwrap_or(NULL_ORIGIN).to_string()
    }
}

/// Which request headers to allow on preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHeaders {
    /// Send this list, comma separated.
    List(Vec<String>),
    /// Echo the request's `Access-Control-Request-Headers`.
    Echo,
}

/// Configuration for the CORS middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsOptions {
    /// Answer `OPTIONS` requests without calling the handler.
    pub preflight: bool,
    /// Allowed origin.
    pub origin: AllowedOrigin,
    /// Value of `Access-Control-Allow-Credentials`.
    pub credentials: bool,
    /// Allowed request headers.
    pub headers: AllowedHeaders,
    /// Allowed methods.
    pub methods: Vec<String>,
    /// Preflight cache duration.
    pub max_age: Option<Duration>,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            preflight: true,
            origin: AllowedOrigin::Literal("*".to_string()),
            credentials: true,
            headers: AllowedHeaders::List(vec!["Content-Type".to_string()]),
            methods: ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_age: None,
        }
    }
}

/// Builder for [`Cors`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    options: CorsOptions,
}

impl CorsBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables preflight handling.
    pub fn preflight(mut self, enabled: bool) -> Self {
        self.options.preflight = enabled;
        self
    }

    /// Always allows this origin value.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.options.origin = AllowedOrigin::Literal(origin.into());
        self
    }

    /// Allows whatever origin the request comes from.
    pub fn echo_origin(mut self) -> Self {
        self.options.origin = AllowedOrigin::Echo;
        self
    }

    /// Allows the listed origins only.
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.origin = AllowedOrigin::List(origins.into_iter().map(Into::into).collect());
        self
    }

    /// Sets `Access-Control-Allow-Credentials`.
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.options.credentials = allow;
        self
    }

    /// Sets the allowed request headers.
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.headers = AllowedHeaders::List(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Allows whatever headers the preflight request asks for.
    pub fn echo_request_headers(mut self) -> Self {
        self.options.headers = AllowedHeaders::Echo;
        self
    }

    /// Sets the allowed methods.
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the preflight cache duration.
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.options.max_age = Some(duration);
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> Cors {
        Cors::new(self.options)
    }
}

/// CORS middleware. See the [module docs](self).
#[derive(Debug, Clone)]
pub struct Cors {
    options: Arc<CorsOptions>,
}

/// Creates the CORS middleware with default options.
pub fn cors() -> Cors {
    Cors::new(CorsOptions::default())
}

impl Cors {
    /// Creates the middleware from options.
    pub fn new(options: CorsOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Creates a builder.
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// The configured options.
    pub fn options(&self) -> &CorsOptions {
        &self.options
    }
}

impl CorsOptions {
    fn simple_headers(&self, request: &SanitizedHeaders) -> Headers {
        let mut out = Headers::new();
        out.insert(
            headers::ALLOW_ORIGIN.to_string(),
            self.origin.header_value(request.get(headers::ORIGIN)),
        );
        out.insert(
            headers::ALLOW_CREDENTIALS.to_string(),
            self.credentials.to_string(),
        );
        out
    }

    fn preflight_response(&self, request: &SanitizedHeaders) -> ProxyResult {
        let mut out = self.simple_headers(request);

        let allow_headers = match &self.headers {
            AllowedHeaders::Echo => request
                .get(headers::REQUEST_HEADERS)
                .unwrap_or_default()
                .to_string(),
            AllowedHeaders::List(list) => list.join(","),
        };
        if !allow_headers.is_empty() {
            out.insert(headers::ALLOW_HEADERS.to_string(), allow_headers);
        }
        if !self.methods.is_empty() {
            out.insert(headers::ALLOW_METHODS.to_string(), self.methods.join(","));
        }
        if let Some(max_age) = self.max_age {
            out.insert(
                headers::ALLOW_MAX_AGE.to_string(),
                max_age.as_secs().to_string(),
            );
        }

        ProxyResult {
            status_code: 200,
            headers: out,
            body: None,
        }
    }
}

impl Middleware<ProxyResult> for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn wrap(&self, inner: BoxHandler) -> BoxHandler {
        let options = Arc::clone(&self.options);
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            let options = Arc::clone(&options);
            async move {
                let request = event.require::<SanitizedHeaders>()?;

                if options.preflight && event.http_method() == Some("OPTIONS") {
                    tracing::debug!("answering CORS preflight");
                    return Ok(options.preflight_response(request));
                }

                let mut merged = options.simple_headers(request);
                let mut result = inner.call(event, ctx).await?;
                merged.append(&mut result.headers);
                result.headers = merged;
                Ok(result)
            }
        })
        .boxed()
    }
}
