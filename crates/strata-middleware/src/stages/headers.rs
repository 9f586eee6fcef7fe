//! Header sanitization.
//!
//! API Gateway delivers headers with the casing the client used. This stage
//! lower-cases every name once so later stages can look headers up by their
//! canonical lower-case name.

use serde_json::Value;
use std::collections::BTreeMap;
use strata_core::{handler_fn, BoxHandler, Context, Event, Handler, Middleware};

/// Request headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedHeaders(BTreeMap<String, String>);

impl SanitizedHeaders {
    /// Builds sanitized headers from a raw `headers` payload field.
    ///
    /// Absent or `null` headers give an empty map. When two names differ
    /// only by case, the last one wins.
    pub fn from_raw(raw: Option<&serde_json::Map<String, Value>>) -> Self {
        let headers = raw
            .into_iter()
            .flatten()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                Some((name.to_ascii_lowercase(), value))
            })
            .collect();
        Self(headers)
    }

    /// Returns the header value for `name`. `name` must be lower case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Like [`SanitizedHeaders::get`], but empty values count as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SanitizedHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into().to_ascii_lowercase(), value.into()))
                .collect(),
        )
    }
}

/// Middleware adding [`SanitizedHeaders`]. See [`sanitize_headers`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizeHeaders;

/// Creates the header sanitization middleware.
pub fn sanitize_headers() -> SanitizeHeaders {
    SanitizeHeaders
}

impl<R: 'static> Middleware<R> for SanitizeHeaders {
    fn name(&self) -> &'static str {
        "sanitize_headers"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        handler_fn(move |event: Event, ctx: Context| {
            let headers = SanitizedHeaders::from_raw(event.headers());
            inner.call(event.with(headers), ctx)
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::ProxyResult;

    #[test]
    fn test_names_are_lower_cased() {
        let event = Event::new(json!({
            "headers": { "Content-Type": "application/json", "X-Request-Id": "abc" }
        }));
        let headers = SanitizedHeaders::from_raw(event.headers());
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("x-request-id"), Some("abc"));
        assert!(headers.get("Content-Type").is_none());
    }

    #[test]
    fn test_null_headers_give_empty_map() {
        let event = Event::new(json!({ "headers": null }));
        assert!(SanitizedHeaders::from_raw(event.headers()).is_empty());
        assert!(SanitizedHeaders::from_raw(None).is_empty());
    }

    #[test]
    fn test_last_casing_wins() {
        let event = Event::new(json!({ "headers": { "Origin": "a", "origin": "b" } }));
        let headers = SanitizedHeaders::from_raw(event.headers());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("origin"), Some("b"));
    }

    #[tokio::test]
    async fn test_middleware_adds_extension() {
        let handler = sanitize_headers().wrap(
            handler_fn(|event: Event, _ctx: Context| async move {
                let host = event.require::<SanitizedHeaders>()?.get("host").map(str::to_string);
                Ok(ProxyResult::ok().with_body(host.unwrap_or_default()))
            })
            .boxed(),
        );
        let event = Event::new(json!({ "headers": { "Host": "example.com" } }));
        let result = handler.call(event, Context::new()).await.unwrap();
        assert_eq!(result.body, Some("example.com".into()));
    }
}
