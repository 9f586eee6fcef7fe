//! The event value that flows through a pipeline.
//!
//! An [`Event`] is the platform payload (an arbitrary JSON object, e.g. an
//! API Gateway proxy event or an SQS batch) plus a set of typed
//! [`Extensions`]. Middlewares enrich the event by value: each one takes the
//! event it received, adds its own extension with [`Event::with`] and hands
//! the result to the next handler.
//!
//! Every extension type is owned by exactly one middleware. A middleware only
//! ever inserts its own types, so the set of extensions grows monotonically
//! towards the terminal handler.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-keyed storage for event enrichments.
///
/// Values are reference counted, so cloning an `Extensions` is cheap and
/// never clones the stored values.
///
/// # Example
///
/// ```
/// use strata_core::Extensions;
///
/// #[derive(Debug, PartialEq)]
/// struct TenantId(String);
///
/// let mut ext = Extensions::new();
/// ext.insert(TenantId("acme".into()));
///
/// assert_eq!(ext.get::<TenantId>(), Some(&TenantId("acme".into())));
/// assert!(ext.get::<u32>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Extensions {
    entries: HashMap<TypeId, Entry>,
}

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Extensions {
    /// Creates empty extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing a previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_name: type_name::<T>(),
                value: Arc::new(value),
            },
        );
    }

    /// Returns the value of type `T`, if present.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| (*entry.value).downcast_ref::<T>())
    }

    /// Checks whether a value of type `T` is present.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

/// An incoming event plus the enrichments added by middlewares.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use strata_core::Event;
///
/// struct Greeting(&'static str);
///
/// let event = Event::new(json!({ "httpMethod": "GET", "path": "/hello" }))
///     .with(Greeting("hi"));
///
/// assert_eq!(event.http_method(), Some("GET"));
/// assert_eq!(event.get::<Greeting>().map(|g| g.0), Some("hi"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Event {
    payload: Value,
    extensions: Extensions,
}

impl Event {
    /// Creates an event from a platform payload.
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            extensions: Extensions::new(),
        }
    }

    /// Reassembles an event from its parts.
    pub fn from_parts(payload: Value, extensions: Extensions) -> Self {
        Self {
            payload,
            extensions,
        }
    }

    /// Splits the event into payload and extensions.
    pub fn into_parts(self) -> (Value, Extensions) {
        (self.payload, self.extensions)
    }

    /// The raw platform payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The extensions added so far.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// A top-level payload field. JSON `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name).filter(|value| !value.is_null())
    }

    /// A top-level payload field holding a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// The `httpMethod` field of an API Gateway proxy event.
    pub fn http_method(&self) -> Option<&str> {
        self.str_field("httpMethod")
    }

    /// The `path` field of an API Gateway proxy event.
    pub fn path(&self) -> Option<&str> {
        self.str_field("path")
    }

    /// The raw `body` field.
    pub fn body(&self) -> Option<&str> {
        self.str_field("body")
    }

    /// The raw `headers` object, exactly as the platform delivered it.
    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.field("headers").and_then(Value::as_object)
    }

    /// Returns the event with a payload field added or replaced.
    ///
    /// A `null` or non-object payload is replaced by an object.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.payload.is_object() {
            self.payload = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.payload {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Removes a payload field and returns it.
    pub fn take_field(&mut self, name: &str) -> Option<Value> {
        self.payload.as_object_mut().and_then(|map| map.remove(name))
    }

    /// Returns the event with one more extension.
    pub fn with<T: Send + Sync + 'static>(mut self, extension: T) -> Self {
        self.extensions.insert(extension);
        self
    }

    /// Returns the extension of type `T`, if present.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Returns the extension of type `T`, or [`Error::MissingExtension`].
    ///
    /// Middlewares use this to check the event-shape they depend on, e.g.
    /// CORS requires the sanitized headers added upstream.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<&T> {
        self.get::<T>().ok_or(Error::MissingExtension {
            type_name: type_name::<T>(),
        })
    }

    /// Checks whether an extension of type `T` is present.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains::<T>()
    }
}

impl From<Value> for Event {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}
