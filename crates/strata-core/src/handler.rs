//! The handler contract.
//!
//! A handler is an asynchronous function of an [`Event`] and the invocation
//! [`Context`] producing a result or failing. Every pipeline stage and the
//! terminal business function satisfy the same [`Handler`] trait, which is
//! what lets arbitrary stages be chained.
//!
//! Handlers are stored as [`BoxHandler`] (`Arc<dyn Handler<R>>`): one
//! allocation at assembly time, one virtual call and one boxed future per
//! invocation.

use crate::context::Context;
use crate::error::Result;
use crate::event::Event;
use crate::response::ProxyResult;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A heap-allocated, type-erased future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased handler.
pub type BoxHandler<R = ProxyResult> = Arc<dyn Handler<R>>;

/// An asynchronous function of an event and a context.
///
/// The returned future is `'static`: a handler clones whatever it needs out
/// of `&self` before the future starts, so the future can outlive the call
/// and run on any executor thread.
///
/// # Example
///
/// ```
/// use strata_core::{handler_fn, Context, Event, Handler, ProxyResult};
///
/// # tokio_test::block_on(async {
/// let hello = handler_fn(|event: Event, _ctx: Context| async move {
///     let path = event.path().unwrap_or("/").to_string();
///     Ok(ProxyResult::ok().with_body(path))
/// });
///
/// let event = Event::new(serde_json::json!({ "path": "/hi" }));
/// let result = hello.call(event, Context::new()).await.unwrap();
/// assert_eq!(result.body, Some("/hi".into()));
/// # });
/// ```
pub trait Handler<R = ProxyResult>: Send + Sync + 'static {
    /// Handles one invocation.
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<R>>;

    /// The terminal handler at the bottom of a composed chain.
    ///
    /// Only composed handlers of two or more middlewares return `Some`.
    fn actual(&self) -> Option<BoxHandler<R>> {
        None
    }

    /// Moves the handler behind an `Arc`.
    fn boxed(self) -> BoxHandler<R>
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl<R: 'static> Handler<R> for BoxHandler<R> {
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<R>> {
        (**self).call(event, ctx)
    }

    fn actual(&self) -> Option<BoxHandler<R>> {
        (**self).actual()
    }

    fn boxed(self) -> BoxHandler<R> {
        self
    }
}

/// A handler backed by an async function.
///
/// Built with [`handler_fn`].
pub struct FnHandler<F> {
    func: F,
}

/// Turns an async function of `(Event, Context)` into a [`Handler`].
pub fn handler_fn<F, Fut, R>(func: F) -> FnHandler<F>
where
    F: Fn(Event, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    FnHandler { func }
}

impl<F, Fut, R> Handler<R> for FnHandler<F>
where
    F: Fn(Event, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<R>> {
        Box::pin((self.func)(event, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, HttpError};

    #[tokio::test]
    async fn test_fn_handler_receives_context() {
        let handler = handler_fn(|_event: Event, ctx: Context| async move {
            Ok(ctx.request_id().unwrap_or_default().to_string())
        });
        let out = handler
            .call(Event::default(), Context::new().with_request_id("r-1"))
            .await
            .unwrap();
        assert_eq!(out, "r-1");
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let handler = handler_fn(|_event: Event, _ctx: Context| async move {
            Err::<(), _>(Error::from(HttpError::forbidden("nope")))
        });
        let err = handler.call(Event::default(), Context::new()).await.unwrap_err();
        assert_eq!(err.declared().and_then(HttpError::status_code), Some(403));
    }

    #[tokio::test]
    async fn test_boxed_handler_delegates() {
        let boxed: BoxHandler<u8> =
            handler_fn(|_event: Event, _ctx: Context| async move { Ok(7_u8) }).boxed();
        assert!(boxed.actual().is_none());
        assert_eq!(boxed.call(Event::default(), Context::new()).await.unwrap(), 7);
    }
}
