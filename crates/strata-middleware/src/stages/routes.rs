//! Method and path dispatch for proxy events.
//!
//! [`Routes`] is a terminal handler: it picks a handler by the event's
//! `httpMethod` and `path` and calls it with the matched `{name}` path
//! segments as [`RouteParams`]. Methods are matched case-insensitively.
//! Events that match no route fail with a 404 [`HttpError`].
//!
//! # Example
//!
//! ```
//! use strata_core::{handler_fn, Context, Event, Handler, ProxyResult};
//! use strata_middleware::stages::{routes, RouteParams};
//!
//! let router = routes()
//!     .get("/users/{id}", handler_fn(|event: Event, _ctx: Context| async move {
//!         let id = event.require::<RouteParams>()?.get("id").unwrap_or_default().to_string();
//!         Ok(ProxyResult::ok().with_body(id))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! # tokio_test::block_on(async {
//! let event = Event::new(serde_json::json!({ "httpMethod": "get", "path": "/users/7" }));
//! let result = router.call(event, Context::new()).await.unwrap();
//! assert_eq!(result.body, Some("7".into()));
//! # });
//! ```

use matchit::Router;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use strata_core::{BoxFuture, BoxHandler, Context, Event, Handler, HttpError, ProxyResult, Result};

/// Path parameters captured by the matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    /// A captured parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over the captured parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A route that could not be registered.
#[derive(Debug, thiserror::Error)]
#[error("invalid route {method} {path}: {source}")]
pub struct RouteError {
    method: String,
    path: String,
    #[source]
    source: matchit::InsertError,
}

/// Collects routes for a [`Routes`] handler.
#[derive(Default)]
pub struct RoutesBuilder {
    routes: Vec<(String, String, BoxHandler)>,
}

/// Starts a route table.
pub fn routes() -> RoutesBuilder {
    RoutesBuilder::default()
}

macro_rules! method_routes {
    ($($fn_name:ident => $method:literal),* $(,)?) => {
        $(
            #[doc = concat!("Adds a `", $method, "` route.")]
            pub fn $fn_name(self, path: impl Into<String>, handler: impl Handler) -> Self {
                self.route($method, path, handler)
            }
        )*
    };
}

impl RoutesBuilder {
    /// Adds a route for any method.
    pub fn route(
        mut self,
        method: impl AsRef<str>,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Self {
        self.routes.push((
            method.as_ref().to_ascii_uppercase(),
            path.into(),
            handler.boxed(),
        ));
        self
    }

    method_routes! {
        get => "GET",
        head => "HEAD",
        post => "POST",
        put => "PUT",
        delete => "DELETE",
        connect => "CONNECT",
        options => "OPTIONS",
        trace => "TRACE",
        patch => "PATCH",
    }

    /// Builds the route table.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] for malformed or conflicting paths.
    pub fn build(self) -> std::result::Result<Routes, RouteError> {
        let mut trees: HashMap<String, Router<BoxHandler>> = HashMap::new();
        for (method, path, handler) in self.routes {
            let tree = trees.entry(method.clone()).or_default();
            if let Err(source) = tree.insert(path.as_str(), handler) {
                return Err(RouteError {
                    method,
                    path,
                    source,
                });
            }
        }
        Ok(Routes {
            trees: Arc::new(trees),
        })
    }
}

impl fmt::Debug for RoutesBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(method, path, _)| format!("{method} {path}")))
            .finish()
    }
}

/// A terminal handler dispatching on method and path. See the
/// [module docs](self).
#[derive(Clone)]
pub struct Routes {
    trees: Arc<HashMap<String, Router<BoxHandler>>>,
}

impl Routes {
    fn lookup(&self, method: &str, path: &str) -> Option<(BoxHandler, RouteParams)> {
        let tree = self.trees.get(&method.to_ascii_uppercase())?;
        let matched = tree.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(matched.value), RouteParams(params)))
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("methods", &self.trees.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Handler for Routes {
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<ProxyResult>> {
        let found = match (event.http_method(), event.path()) {
            (Some(method), Some(path)) => self.lookup(method, path),
            _ => None,
        };
        match found {
            Some((handler, params)) => handler.call(event.with(params), ctx),
            None => {
                tracing::debug!(
                    method = event.http_method(),
                    path = event.path(),
                    "no route matched"
                );
                Box::pin(async { Err(HttpError::not_found("Not Found").into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::handler_fn;

    fn reply(label: &'static str) -> impl Handler {
        handler_fn(move |event: Event, _ctx: Context| async move {
            let params = event.require::<RouteParams>()?;
            let id = params.get("id").unwrap_or("-");
            Ok(ProxyResult::ok().with_body(format!("{label}:{id}")))
        })
    }

    fn table() -> Routes {
        routes()
            .get("/users", reply("list"))
            .get("/users/{id}", reply("show"))
            .post("/users", reply("create"))
            .route("purge", "/users", reply("purge"))
            .build()
            .unwrap()
    }

    async fn dispatch(routes: &Routes, method: &str, path: &str) -> Result<ProxyResult> {
        let event = Event::new(json!({ "httpMethod": method, "path": path }));
        routes.call(event, Context::new()).await
    }

    #[tokio::test]
    async fn test_dispatch_by_method_and_path() {
        let routes = table();
        let body = |result: ProxyResult| result.body.unwrap();
        assert_eq!(body(dispatch(&routes, "get", "/users").await.unwrap()), "list:-".into());
        assert_eq!(body(dispatch(&routes, "GET", "/users/7").await.unwrap()), "show:7".into());
        assert_eq!(body(dispatch(&routes, "post", "/users").await.unwrap()), "create:-".into());
        assert_eq!(body(dispatch(&routes, "PURGE", "/users").await.unwrap()), "purge:-".into());
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let routes = table();
        for (method, path) in [("delete", "/users"), ("get", "/orders"), ("get", "/users/7/x")] {
            let error = dispatch(&routes, method, path).await.unwrap_err();
            assert_eq!(error.declared().and_then(HttpError::status_code), Some(404));
        }
        let error = routes.call(Event::default(), Context::new()).await.unwrap_err();
        assert_eq!(error.declared().and_then(HttpError::status_code), Some(404));
    }

    #[test]
    fn test_conflicting_routes_fail_to_build() {
        let error = routes()
            .get("/users/{id}", reply("a"))
            .get("/users/{name}", reply("b"))
            .build()
            .unwrap_err();
        assert!(error.to_string().starts_with("invalid route GET /users/{name}"));
    }
}
