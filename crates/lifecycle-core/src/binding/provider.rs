use std::fmt;
use std::sync::Arc;

use crate::binding::{ActionBinder, LifecycleAware, StageMethods, short_type_name};
use crate::kernel::error::Result;
use crate::kernel::lifecycle::Lifecycle;
use crate::stage_manager::{ActionError, Stage};

type Factory<T> = Box<dyn Fn() -> Option<Arc<T>> + Send + Sync>;

/// Wraps an object factory so that every object it produces is bound to the
/// lifecycle before it is handed out.
///
/// If binding fails (a non catch-up stage has already passed) the whole
/// `get` call fails and the caller never receives the instance. A factory
/// that produces nothing is not an error.
pub struct LifecycleProvider<T> {
    factory: Factory<T>,
    binder: ActionBinder,
    methods: StageMethods<T>,
}

impl<T> fmt::Debug for LifecycleProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleProvider")
            .field("type", &short_type_name::<T>())
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl<T: LifecycleAware> LifecycleProvider<T> {
    /// Wrap a factory that always produces an instance.
    pub fn new<F>(lifecycle: Arc<Lifecycle>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_methods(lifecycle, T::stage_methods(), move || Some(Arc::new(factory())))
    }

    /// Wrap a factory that may legitimately produce nothing.
    pub fn optional<F>(lifecycle: Arc<Lifecycle>, factory: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::with_methods(lifecycle, T::stage_methods(), move || factory().map(Arc::new))
    }
}

impl<T: Send + Sync + 'static> LifecycleProvider<T> {
    /// Wrap a factory of shared instances with an explicit method table.
    pub fn with_methods<F>(lifecycle: Arc<Lifecycle>, methods: StageMethods<T>, factory: F) -> Self
    where
        F: Fn() -> Option<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            binder: ActionBinder::new(lifecycle),
            methods,
        }
    }

    /// Add an action run for every object this provider creates from now on,
    /// after the object's own stage methods.
    pub fn add_action<F>(&mut self, stage: Stage, name: &'static str, action: F)
    where
        F: Fn(&T) -> std::result::Result<(), ActionError> + Send + Sync + 'static,
    {
        self.methods.push(stage, name, action);
    }

    /// Builder form of [`add_action`](LifecycleProvider::add_action).
    pub fn with_action<F>(mut self, stage: Stage, name: &'static str, action: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), ActionError> + Send + Sync + 'static,
    {
        self.add_action(stage, name, action);
        self
    }

    /// The stage methods bound to each created instance
    pub fn methods(&self) -> &StageMethods<T> {
        &self.methods
    }

    /// Create an instance and bind it.
    pub fn get(&self) -> Result<Option<Arc<T>>> {
        let Some(instance) = (self.factory)() else {
            log::debug!("Provider for {} produced no instance", short_type_name::<T>());
            return Ok(None);
        };
        self.binder.bind_with(&instance, &self.methods)?;
        Ok(Some(instance))
    }
}
