//! Dependency injection middleware.
//!
//! Gives every call of a wrapped handler access to a lazily built
//! [`Container`]. The container is created on the first call of each
//! wrapped handler instance and shared by all later calls, so dependencies
//! such as clients or connection pools survive across warm invocations.
//!
//! # Example
//!
//! ```
//! use strata_core::{handler_fn, Context, Dependencies, Event, Handler, Middleware, ProxyResult};
//! use strata_middleware::stages::{inject, Deps};
//!
//! let deps = Dependencies::new().provide("greeting", |_| Ok(String::from("hello")));
//!
//! let handler = inject(deps).wrap(
//!     handler_fn(|event: Event, _ctx: Context| async move {
//!         let greeting = event.require::<Deps>()?.require::<String>("greeting")?;
//!         Ok(ProxyResult::ok().with_body(greeting.as_str()))
//!     })
//!     .boxed(),
//! );
//!
//! # tokio_test::block_on(async {
//! let result = handler.call(Event::default(), Context::new()).await.unwrap();
//! assert_eq!(result.body, Some("hello".into()));
//! # });
//! ```

use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use strata_core::{
    BoxFuture, BoxHandler, Container, Context, Dependencies, Event, Handler, Middleware, Result,
};

/// The dependency container of the current handler, added to the event.
#[derive(Debug, Clone)]
pub struct Deps(Arc<Container>);

impl Deps {
    /// Wraps a container.
    pub fn new(container: Arc<Container>) -> Self {
        Self(container)
    }

    /// The shared container.
    pub fn container(&self) -> &Arc<Container> {
        &self.0
    }
}

impl Deref for Deps {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.0
    }
}

/// Middleware that adds a [`Deps`] extension. See [`inject`].
#[derive(Debug, Clone)]
pub struct Inject {
    dependencies: Dependencies,
}

/// Creates the injection middleware for a set of dependency factories.
pub fn inject(dependencies: Dependencies) -> Inject {
    Inject { dependencies }
}

impl<R: 'static> Middleware<R> for Inject {
    fn name(&self) -> &'static str {
        "inject"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        Arc::new(InjectHandler {
            dependencies: self.dependencies.clone(),
            container: OnceLock::new(),
            inner,
        })
    }
}

struct InjectHandler<R> {
    dependencies: Dependencies,
    container: OnceLock<Arc<Container>>,
    inner: BoxHandler<R>,
}

impl<R: 'static> Handler<R> for InjectHandler<R> {
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, Result<R>> {
        let container = self.container.get_or_init(|| {
            tracing::debug!(declared = self.dependencies.len(), "creating dependency container");
            Arc::new(self.dependencies.build())
        });
        self.inner
            .call(event.with(Deps::new(Arc::clone(container))), ctx)
    }
}
