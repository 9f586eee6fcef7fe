//! Middleware composition.
//!
//! [`compose`] folds an ordered list of middlewares into one. The first
//! middleware is the outermost: its pre-logic runs first and its post-logic
//! runs last.
//!
//! ```text
//! compose([m1, m2, m3]).wrap(h)  ==  m1.wrap(m2.wrap(m3.wrap(h)))
//!
//! call:  m1 → m2 → m3 → h
//! reply: h → m3 → m2 → m1
//! ```
//!
//! When two or more middlewares are composed, the handler produced by
//! [`Composed::wrap`] exposes the original terminal handler through
//! [`Handler::actual`], so tests can reach the business function without the
//! surrounding stages.

use crate::context::Context;
use crate::error::Result;
use crate::event::Event;
use crate::handler::{BoxFuture, BoxHandler, Handler};
use crate::middleware::{BoxMiddleware, Middleware};
use crate::response::ProxyResult;
use std::fmt;
use std::sync::Arc;

/// An ordered stack of middlewares acting as one.
///
/// Built with [`compose`] or the [`compose!`](crate::compose!) macro.
pub struct Composed<R = ProxyResult> {
    stages: Vec<BoxMiddleware<R>>,
}

/// Composes middlewares, outermost first.
///
/// A single middleware wraps exactly as it would on its own. An empty list
/// is accepted but logged, and wraps as the identity.
///
/// # Example
///
/// ```
/// use strata_core::{compose, handler_fn, BoxHandler, Context, Event, FnMiddleware, Handler};
/// use strata_core::{Middleware, ProxyResult};
/// use std::sync::Arc;
///
/// let tag = |name: &'static str| {
///     FnMiddleware::new(name, move |event: Event, ctx: Context, next: BoxHandler| async move {
///         let result = next.call(event, ctx).await?;
///         Ok(result.with_header(name, "seen"))
///     })
/// };
///
/// let stack = compose::compose(vec![compose::stage(tag("x-outer")), compose::stage(tag("x-inner"))]);
/// let terminal = handler_fn(|_event: Event, _ctx: Context| async move { Ok(ProxyResult::ok()) })
///     .boxed();
/// let handler = stack.wrap(terminal.clone());
///
/// assert!(Arc::ptr_eq(&handler.actual().unwrap(), &terminal));
/// assert_eq!(stack.names(), vec!["x-outer", "x-inner"]);
/// ```
pub fn compose<R: 'static>(stages: Vec<BoxMiddleware<R>>) -> Composed<R> {
    if stages.is_empty() {
        tracing::warn!("compose called without middlewares; the result passes calls through");
    }
    Composed { stages }
}

/// Erases a middleware into a [`BoxMiddleware`]. Used by [`compose!`](crate::compose!).
pub fn stage<R, M>(middleware: M) -> BoxMiddleware<R>
where
    M: Middleware<R>,
    R: 'static,
{
    Arc::new(middleware)
}

/// Composes middlewares, outermost first.
///
/// ```
/// use strata_core::{compose, Middleware};
/// # use strata_core::{BoxHandler, Context, Event, FnMiddleware, ProxyResult};
/// # let a = FnMiddleware::new("a", |e: Event, c: Context, n: BoxHandler<ProxyResult>| n.call(e, c));
/// # let b = FnMiddleware::new("b", |e: Event, c: Context, n: BoxHandler<ProxyResult>| n.call(e, c));
///
/// let stack = compose![a, b];
/// assert_eq!(stack.names(), vec!["a", "b"]);
/// ```
#[macro_export]
macro_rules! compose {
    ($($middleware:expr),* $(,)?) => {
        $crate::compose::compose(::std::vec![$($crate::compose::stage($middleware)),*])
    };
}

impl<R: 'static> Composed<R> {
    /// Names of the composed middlewares, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Number of composed middlewares.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if nothing was composed.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<R: 'static> Middleware<R> for Composed<R> {
    fn name(&self) -> &'static str {
        "compose"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        match self.stages.as_slice() {
            [] => inner,
            [only] => only.wrap(inner),
            stages => {
                let outer = stages
                    .iter()
                    .rev()
                    .fold(Arc::clone(&inner), |handler, stage| stage.wrap(handler));
                Arc::new(ComposedHandler {
                    outer,
                    actual: inner,
                })
            }
        }
    }
}

impl<R: 'static> fmt::Debug for Composed<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

struct ComposedHandler<R> {
    outer: BoxHandler<R>,
    actual: BoxHandler<R>,
}

impl<R: 'static> Handler<R> for ComposedHandler<R> {
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<R>> {
        self.outer.call(event, ctx)
    }

    fn actual(&self) -> Option<BoxHandler<R>> {
        Some(Arc::clone(&self.actual))
    }
}
