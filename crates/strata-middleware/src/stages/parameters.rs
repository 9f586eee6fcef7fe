//! Percent-decoding of path and query parameters.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{
    handler_fn, BoxHandler, Context, Event, Handler, HttpError, Middleware, Result,
};

/// Decoded `pathParameters`, `queryStringParameters` and
/// `multiValueQueryStringParameters`. Absent or `null` sets are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedParameters {
    /// Path parameters.
    pub path: BTreeMap<String, String>,
    /// Single-value query parameters.
    pub query: BTreeMap<String, String>,
    /// Multi-value query parameters.
    pub multi_value_query: BTreeMap<String, Vec<String>>,
}

impl DecodedParameters {
    /// Decodes the parameter sets of an event.
    ///
    /// `null` values are skipped. Values that do not decode to UTF-8 fail
    /// with a 400 error naming the parameter.
    pub fn from_event(event: &Event) -> Result<Self> {
        let object = |name: &str| event.field(name).and_then(Value::as_object);
        Ok(Self {
            path: decode_single(object("pathParameters"))?,
            query: decode_single(object("queryStringParameters"))?,
            multi_value_query: decode_multi(object("multiValueQueryStringParameters"))?,
        })
    }

    /// A decoded path parameter.
    pub fn path(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    /// A decoded query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// All decoded values of a query parameter.
    pub fn query_all(&self, name: &str) -> &[String] {
        self.multi_value_query
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn decode_value(name: &str, value: &Value) -> Result<Option<String>> {
    let raw: Cow<'_, str> = match value {
        Value::Null => return Ok(None),
        Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    };
    match urlencoding::decode(&raw) {
        Ok(decoded) => Ok(Some(decoded.into_owned())),
        Err(_) => Err(HttpError::bad_request(format!("Malformed parameter \"{name}\"")).into()),
    }
}

fn decode_single(raw: Option<&Map<String, Value>>) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (name, value) in raw.into_iter().flatten() {
        if let Some(decoded) = decode_value(name, value)? {
            out.insert(name.clone(), decoded);
        }
    }
    Ok(out)
}

fn decode_multi(raw: Option<&Map<String, Value>>) -> Result<BTreeMap<String, Vec<String>>> {
    let mut out = BTreeMap::new();
    for (name, value) in raw.into_iter().flatten() {
        let values = match value {
            Value::Array(values) => values.as_slice(),
            Value::Null => continue,
            single => std::slice::from_ref(single),
        };
        let mut decoded = Vec::with_capacity(values.len());
        for value in values {
            decoded.extend(decode_value(name, value)?);
        }
        out.insert(name.clone(), decoded);
    }
    Ok(out)
}

/// Middleware adding [`DecodedParameters`]. See [`decode_parameters`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeParameters;

/// Creates the parameter decoding middleware.
pub fn decode_parameters() -> DecodeParameters {
    DecodeParameters
}

impl<R: 'static> Middleware<R> for DecodeParameters {
    fn name(&self) -> &'static str {
        "decode_parameters"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            async move {
                let decoded = DecodedParameters::from_event(&event)?;
                inner.call(event.with(decoded), ctx).await
            }
        })
        .boxed()
    }
}
