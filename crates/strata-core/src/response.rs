//! Result types returned by handlers.
//!
//! [`ProxyResult`] is the API Gateway proxy result shape; [`BatchResponse`]
//! is the partial-failure report understood by queue event sources.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Response headers, name to value.
pub type Headers = BTreeMap<String, String>;

/// A response body.
///
/// Handlers may return structured JSON; the `serialize_json` middleware turns
/// it into text before the result leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    /// An already encoded body.
    Text(String),
    /// A structured body not yet encoded.
    Json(Value),
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// An API Gateway proxy result.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use strata_core::{Body, ProxyResult};
///
/// let result = ProxyResult::new(201)
///     .with_header("Location", "/orders/7")
///     .with_body(json!({ "id": 7 }));
///
/// assert_eq!(result.status_code, 201);
/// assert_eq!(result.body, Some(Body::Json(json!({ "id": 7 }))));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    /// Response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

impl ProxyResult {
    /// Creates a result with no headers and no body.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: Headers::new(),
            body: None,
        }
    }

    /// 200 OK with no body.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Adds or replaces a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the header value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One failed record of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    /// The message id of the failed record.
    pub item_identifier: String,
}

/// Partial batch failure report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Failed records, in record order.
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl BatchResponse {
    /// The identifiers of the failed records.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.batch_item_failures
            .iter()
            .map(|failure| failure.item_identifier.as_str())
            .collect()
    }
}
