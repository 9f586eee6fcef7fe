//! Lazy dependency container.
//!
//! Dependencies are declared by name with a factory. A factory receives the
//! [`Container`] so it can resolve its own dependencies. Nothing is built
//! until first requested; a built value is cached for the lifetime of the
//! container, whatever the value is (`false`, `0` and empty strings are
//! cached like anything else).
//!
//! One [`Dependencies`] declaration is typically turned into one container
//! per wrapped handler by the `inject` middleware, so every composed handler
//! owns its own cache.
//!
//! # Example
//!
//! ```rust
//! use strata_core::di::Dependencies;
//!
//! struct Config {
//!     table: String,
//! }
//!
//! struct Repository {
//!     table: String,
//! }
//!
//! let deps = Dependencies::new()
//!     .provide("config", |_| Ok(Config { table: "orders".into() }))
//!     .provide("repository", |c| {
//!         let config = c.require::<Config>("config")?;
//!         Ok(Repository { table: config.table.clone() })
//!     });
//!
//! let container = deps.build();
//! let repository = container.require::<Repository>("repository").unwrap();
//! assert_eq!(repository.table, "orders");
//! ```
//!
//! # Cycles
//!
//! A factory that, directly or through others, requests the name it is
//! building fails with [`Error::CircularDependency`] carrying the
//! resolution chain, e.g. `"b" -> "a" -> "b"`.

use crate::error::{Error, Result};
use parking_lot::ReentrantMutex;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A built dependency, type-erased.
pub type Service = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Container) -> Result<Service> + Send + Sync>;

/// A set of named dependency factories.
#[derive(Clone, Default)]
pub struct Dependencies {
    factories: HashMap<String, Factory>,
}

impl Dependencies {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, built by `factory` on first request.
    ///
    /// Declaring a name twice keeps the last factory.
    #[must_use]
    pub fn provide<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move |container: &Container| {
                factory(container).map(|value| Arc::new(value) as Service)
            }),
        );
        self
    }

    /// Declares `name` as an already built value.
    #[must_use]
    pub fn provide_value<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let value: Service = Arc::new(value);
        let factory: Factory = Arc::new(move |_: &Container| Ok::<_, Error>(Arc::clone(&value)));
        self.factories.insert(name.into(), factory);
        self
    }

    /// Checks whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of declared names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Creates a fresh container with an empty cache.
    #[must_use]
    pub fn build(&self) -> Container {
        Container {
            factories: self.factories.clone(),
            state: ReentrantMutex::new(RefCell::new(State::default())),
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort_unstable();
        f.debug_struct("Dependencies").field("names", &names).finish()
    }
}

enum Cell {
    InProgress,
    Resolved(Service),
}

#[derive(Default)]
struct State {
    cells: HashMap<String, Cell>,
    chain: Vec<String>,
}

// Leaves `name` off the chain once its factory returns, fails or panics.
// A name that did not resolve goes back to unresolved.
struct Resolving<'a> {
    state: &'a RefCell<State>,
    name: &'a str,
}

impl Drop for Resolving<'_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        state.chain.pop();
        if matches!(state.cells.get(self.name), Some(Cell::InProgress)) {
            state.cells.remove(self.name);
        }
    }
}

/// A lazily populated dependency cache.
///
/// The container is `Send + Sync`. A resolution holds the container lock
/// until the requested value and everything it depends on are built, so a
/// factory runs at most once per container even under concurrent requests.
/// Factories must therefore not block on other threads that use the same
/// container.
pub struct Container {
    factories: HashMap<String, Factory>,
    state: ReentrantMutex<RefCell<State>>,
}

impl Container {
    /// Resolves `name` without checking its type.
    ///
    /// Returns `Ok(None)` if `name` is not declared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`] when `name` is already being
    /// resolved further up the chain, or whatever the factory fails with.
    /// A failed factory is not cached; the next request runs it again.
    pub fn inject(&self, name: &str) -> Result<Option<Service>> {
        let Some(factory) = self.factories.get(name) else {
            return Ok(None);
        };

        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            match state.cells.get(name) {
                Some(Cell::Resolved(service)) => return Ok(Some(Arc::clone(service))),
                Some(Cell::InProgress) => {
                    let mut chain = state.chain.clone();
                    chain.push(name.to_string());
                    return Err(Error::CircularDependency { chain });
                }
                None => {}
            }
            state.cells.insert(name.to_string(), Cell::InProgress);
            state.chain.push(name.to_string());
        }

        let _resolving = Resolving { state: &guard, name };
        let service = factory(self)?;

        tracing::debug!(dependency = name, "dependency resolved");
        guard
            .borrow_mut()
            .cells
            .insert(name.to_string(), Cell::Resolved(Arc::clone(&service)));
        Ok(Some(service))
    }

    /// Resolves `name` as a `T`.
    ///
    /// Returns `Ok(None)` if `name` is not declared.
    ///
    /// # Errors
    ///
    /// Same as [`Container::inject`], plus [`Error::DependencyType`] when the
    /// value is not a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>> {
        self.inject(name)?
            .map(|service| {
                service.downcast::<T>().map_err(|_| Error::DependencyType {
                    name: name.to_string(),
                    expected: type_name::<T>(),
                })
            })
            .transpose()
    }

    /// Resolves `name` as a `T`, failing if it is not declared.
    ///
    /// # Errors
    ///
    /// Same as [`Container::get`], plus [`Error::MissingDependency`].
    pub fn require<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.get(name)?.ok_or_else(|| Error::MissingDependency {
            name: name.to_string(),
        })
    }

    /// Checks whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Checks whether `name` has already been built.
    #[must_use]
    pub fn is_resolved(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        matches!(state.cells.get(name), Some(Cell::Resolved(_)))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("declared", &self.factories.len())
            .finish_non_exhaustive()
    }
}
