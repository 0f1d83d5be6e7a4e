//! # Lifecycle Core Binding
//!
//! Turns objects into lifecycle participants.
//!
//! A type describes which of its methods run at which stage through a
//! [`StageMethods`] table, usually by implementing [`LifecycleAware`]. The
//! [`ActionBinder`](binder::ActionBinder) turns the table plus an instance into actions,
//! catching up stages the instance missed when policy allows it, and the
//! [`LifecycleProvider`](provider::LifecycleProvider) wraps a factory so every object it
//! produces is bound before the caller sees it.
pub mod binder;
pub mod provider;

use std::fmt;
use std::sync::Arc;

use crate::stage_manager::{ActionError, Stage};

/// Invoker for one stage method of `T`
pub type StageMethodFn<T> = Arc<dyn Fn(&T) -> Result<(), ActionError> + Send + Sync>;

/// A method of `T` tagged with the stage it runs in.
pub struct StageMethod<T: ?Sized> {
    stage: Stage,
    name: &'static str,
    invoke: StageMethodFn<T>,
}

impl<T: ?Sized> Clone for StageMethod<T> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage.clone(),
            name: self.name,
            invoke: Arc::clone(&self.invoke),
        }
    }
}

impl<T: ?Sized> fmt::Debug for StageMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageMethod")
            .field("stage", &self.stage)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> StageMethod<T> {
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the method against `target`.
    pub fn call(&self, target: &T) -> Result<(), ActionError> {
        (self.invoke)(target)
    }
}

/// Ordered table of a type's stage methods.
///
/// Methods of the same stage run in table order. By convention a type lists
/// its own methods first and then [`inherit`](StageMethods::inherit)s the tables of
/// the components it embeds, so the most specific methods run first.
pub struct StageMethods<T: ?Sized> {
    methods: Vec<StageMethod<T>>,
}

impl<T: ?Sized> Clone for StageMethods<T> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for StageMethods<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.iter()).finish()
    }
}

impl<T: ?Sized> Default for StageMethods<T> {
    fn default() -> Self {
        Self { methods: Vec::new() }
    }
}

impl<T: ?Sized + 'static> StageMethods<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a method with a stage.
    pub fn on<F>(mut self, stage: Stage, name: &'static str, method: F) -> Self
    where
        F: Fn(&T) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.push(stage, name, method);
        self
    }

    /// Non-consuming form of [`on`](StageMethods::on).
    pub fn push<F>(&mut self, stage: Stage, name: &'static str, method: F)
    where
        F: Fn(&T) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.methods.push(StageMethod {
            stage,
            name,
            invoke: Arc::new(method),
        });
    }

    /// Append the methods of an embedded component, reached through `project`.
    pub fn inherit<U>(mut self, base: StageMethods<U>, project: fn(&T) -> &U) -> Self
    where
        U: ?Sized + 'static,
    {
        for method in base.methods {
            let invoke = method.invoke;
            self.methods.push(StageMethod {
                stage: method.stage,
                name: method.name,
                invoke: Arc::new(move |target: &T| invoke(project(target))),
            });
        }
        self
    }

    /// Append every method of `other`.
    pub fn extend(mut self, other: &StageMethods<T>) -> Self {
        self.methods.extend(other.methods.iter().cloned());
        self
    }

    /// Keep only the methods whose stage satisfies `keep`.
    pub fn retain(mut self, keep: impl Fn(&Stage) -> bool) -> Self {
        self.methods.retain(|method| keep(&method.stage));
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StageMethod<T>> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Implemented by types that carry their own stage methods.
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use lifecycle_core::binding::{LifecycleAware, StageMethods};
/// use lifecycle_core::stage_manager::Stage;
///
/// #[derive(Default)]
/// struct Server {
///     running: AtomicBool,
/// }
///
/// impl LifecycleAware for Server {
///     fn stage_methods() -> StageMethods<Self> {
///         StageMethods::new()
///             .on(Stage::START, "start", |s: &Server| {
///                 s.running.store(true, Ordering::SeqCst);
///                 Ok(())
///             })
///             .on(Stage::STOP, "stop", |s: &Server| {
///                 s.running.store(false, Ordering::SeqCst);
///                 Ok(())
///             })
///     }
/// }
/// ```
pub trait LifecycleAware: Send + Sync + Sized + 'static {
    fn stage_methods() -> StageMethods<Self>;
}

/// Short type name used in logs and late-binding errors.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Strip the module path but keep generic arguments readable
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

// Re-export important types
pub use binder::ActionBinder;
pub use provider::LifecycleProvider;
