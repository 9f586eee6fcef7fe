//! The middleware contract.
//!
//! A middleware turns one handler into another. The inner handler expects
//! an event enriched by this middleware and produces an `Inner` result; the
//! returned outer handler accepts the un-enriched event and produces an
//! `Outer` result. Most middlewares keep the result type
//! (`Middleware<ProxyResult>`); serializers and batch adapters change it.
//!
//! # Invariants
//!
//! - A middleware forwards the [`Context`] to the inner handler unchanged
//!   unless consuming it is its stated purpose.
//! - A middleware only adds extensions it owns; it never removes others.
//! - A middleware does not intercept errors unless translating them is its
//!   stated purpose.
//!
//! # Example
//!
//! ```
//! use strata_core::{handler_fn, BoxHandler, Context, Event, FnMiddleware, Handler};
//! use strata_core::{MiddlewareExt, ProxyResult};
//!
//! struct Tenant(String);
//!
//! let tenant = FnMiddleware::new(
//!     "tenant",
//!     |event: Event, ctx: Context, next: BoxHandler| async move {
//!         let name = event.str_field("tenant").unwrap_or("default").to_string();
//!         next.call(event.with(Tenant(name)), ctx).await
//!     },
//! );
//!
//! let handler = tenant.apply(handler_fn(|event: Event, _ctx: Context| async move {
//!     let tenant = &event.require::<Tenant>()?.0;
//!     Ok(ProxyResult::ok().with_body(tenant.clone()))
//! }));
//!
//! # tokio_test::block_on(async {
//! let result = handler.call(Event::default(), Context::new()).await.unwrap();
//! assert_eq!(result.body, Some("default".into()));
//! # });
//! ```

use crate::context::Context;
use crate::error::Result;
use crate::event::Event;
use crate::handler::{BoxFuture, BoxHandler, Handler};
use crate::response::ProxyResult;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A transform from an inner handler to an outer handler.
pub trait Middleware<Inner = ProxyResult, Outer = Inner>: Send + Sync + 'static {
    /// Name of the middleware, used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Wraps `inner`, returning the handler that callers invoke.
    ///
    /// Wrapping must not run any per-call logic; it happens once when the
    /// pipeline is assembled.
    fn wrap(&self, inner: BoxHandler<Inner>) -> BoxHandler<Outer>;
}

/// A shared, type-erased middleware that keeps the result type.
pub type BoxMiddleware<R = ProxyResult> = Arc<dyn Middleware<R>>;

impl<I: 'static, O: 'static> Middleware<I, O> for Arc<dyn Middleware<I, O>> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn wrap(&self, inner: BoxHandler<I>) -> BoxHandler<O> {
        (**self).wrap(inner)
    }
}

/// Combinators available on every middleware.
pub trait MiddlewareExt<I, O>: Middleware<I, O> + Sized {
    /// Chains `inner` inside `self`.
    ///
    /// The result type may change at each link, which is how stages such as
    /// serializers or batch adapters are composed with static typing.
    fn then<M, J>(self, inner: M) -> Then<Self, M, I>
    where
        M: Middleware<J, I>,
        I: 'static,
    {
        Then {
            outer: self,
            inner,
            _mid: PhantomData,
        }
    }

    /// Wraps a handler value.
    fn apply<H: Handler<I>>(&self, handler: H) -> BoxHandler<O> {
        self.wrap(handler.boxed())
    }
}

impl<T, I, O> MiddlewareExt<I, O> for T where T: Middleware<I, O> {}

/// Two middlewares chained by [`MiddlewareExt::then`].
pub struct Then<A, B, Mid> {
    outer: A,
    inner: B,
    _mid: PhantomData<fn() -> Mid>,
}

impl<A, B, Inner, Mid, Outer> Middleware<Inner, Outer> for Then<A, B, Mid>
where
    A: Middleware<Mid, Outer>,
    B: Middleware<Inner, Mid>,
    Mid: 'static,
{
    fn name(&self) -> &'static str {
        self.outer.name()
    }

    fn wrap(&self, inner: BoxHandler<Inner>) -> BoxHandler<Outer> {
        self.outer.wrap(self.inner.wrap(inner))
    }
}

/// A middleware built from an async function of `(event, ctx, next)`.
///
/// `next` is the wrapped inner handler. Annotate the closure parameters so
/// the inner and outer result types can be inferred.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: Arc<F>,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            func: Arc::new(func),
        }
    }
}

impl<F, Fut, I, O> Middleware<I, O> for FnMiddleware<F>
where
    F: Fn(Event, Context, BoxHandler<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: 'static,
    O: 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, inner: BoxHandler<I>) -> BoxHandler<O> {
        Arc::new(FnStage {
            func: Arc::clone(&self.func),
            inner,
        })
    }
}

struct FnStage<F, I> {
    func: Arc<F>,
    inner: BoxHandler<I>,
}

impl<F, Fut, I, O> Handler<O> for FnStage<F, I>
where
    F: Fn(Event, Context, BoxHandler<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: 'static,
{
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<O>> {
        Box::pin((self.func)(event, ctx, Arc::clone(&self.inner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;

    struct Hops(Vec<&'static str>);

    type HopFn = fn(Event, Context, BoxHandler<usize>) -> BoxFuture<'static, Result<usize>>;

    fn hop_call(event: Event, ctx: Context, next: BoxHandler<usize>) -> BoxFuture<'static, Result<usize>> {
        let mut hops = event.get::<Hops>().map(|h| h.0.clone()).unwrap_or_default();
        hops.push("hop");
        next.call(event.with(Hops(hops)), ctx)
    }

    fn hop(name: &'static str) -> FnMiddleware<HopFn> {
        FnMiddleware::new(name, hop_call as HopFn)
    }

    fn count_hops() -> BoxHandler<usize> {
        handler_fn(|event: Event, _ctx: Context| async move {
            Ok(event.get::<Hops>().map_or(0, |h| h.0.len()))
        })
        .boxed()
    }

    #[tokio::test]
    async fn test_fn_middleware_enriches_event() {
        let handler = hop("a").wrap(count_hops());
        assert_eq!(handler.call(Event::default(), Context::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_then_changes_result_type() {
        let describe = FnMiddleware::new(
            "describe",
            |event: Event, ctx: Context, next: BoxHandler<usize>| async move {
                let hops = next.call(event, ctx).await?;
                Ok(format!("{hops} hops"))
            },
        );
        let chain = describe.then(hop("a")).then(hop("b"));
        let handler = chain.apply(count_hops());
        assert_eq!(
            handler.call(Event::default(), Context::new()).await.unwrap(),
            "2 hops"
        );
        assert_eq!(chain.name(), "describe");
    }

    #[tokio::test]
    async fn test_context_is_forwarded() {
        let passthrough = FnMiddleware::new(
            "passthrough",
            |event: Event, ctx: Context, next: BoxHandler<String>| async move {
                next.call(event, ctx).await
            },
        );
        let handler = passthrough.apply(handler_fn(|_event: Event, ctx: Context| async move {
            Ok(ctx.request_id().unwrap_or_default().to_string())
        }));
        let out = handler
            .call(Event::default(), Context::new().with_request_id("req-9"))
            .await
            .unwrap();
        assert_eq!(out, "req-9");
    }
}
