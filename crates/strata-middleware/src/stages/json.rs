//! JSON request and response bodies.
//!
//! [`parse_json`] decodes the request body into a [`JsonBody`] extension;
//! [`serialize_json`] encodes a structured response body as text. Used
//! together, handlers read and return `serde_json::Value`s and never touch
//! raw strings.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use strata_core::{
    handler_fn, Body, BoxHandler, Context, Event, Handler, Middleware, ProxyResult, Result,
};

/// The decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl JsonBody {
    /// Decodes a raw body. An absent or empty body decodes to `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`strata_core::Error::Json`] when the body is not valid JSON.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(text) if !text.is_empty() => Ok(Self(serde_json::from_str(text)?)),
            _ => Ok(Self(Value::Object(Map::new()))),
        }
    }

    /// The decoded value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Deserializes the body into a typed value.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.0)?)
    }
}

/// Middleware adding [`JsonBody`]. See [`parse_json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseJson;

/// Creates the body parsing middleware.
pub fn parse_json() -> ParseJson {
    ParseJson
}

impl<R: 'static> Middleware<R> for ParseJson {
    fn name(&self) -> &'static str {
        "parse_json"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            async move {
                let body = JsonBody::parse(event.body())?;
                inner.call(event.with(body), ctx).await
            }
        })
        .boxed()
    }
}

/// Middleware encoding structured response bodies. See [`serialize_json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeJson;

/// Creates the body serialization middleware.
///
/// A [`Body::Json`] body becomes [`Body::Text`] holding its compact JSON
/// encoding. Text bodies, missing bodies, the status code and headers are
/// left as they are.
pub fn serialize_json() -> SerializeJson {
    SerializeJson
}

/// Encodes a result's structured body in place.
pub fn encode_body(mut result: ProxyResult) -> ProxyResult {
    if let Some(Body::Json(value)) = &result.body {
        result.body = Some(Body::Text(value.to_string()));
    }
    result
}

impl Middleware<ProxyResult> for SerializeJson {
    fn name(&self) -> &'static str {
        "serialize_json"
    }

    fn wrap(&self, inner: BoxHandler) -> BoxHandler {
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            async move { inner.call(event, ctx).await.map(encode_body) }
        })
        .boxed()
    }
}
