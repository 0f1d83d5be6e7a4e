use std::sync::{Arc, Weak};

use crate::binding::{LifecycleAware, StageMethods, short_type_name};
use crate::kernel::error::Result;
use crate::kernel::lifecycle::{BindOutcome, Lifecycle};
use crate::stage_manager::Action;

/// Binds instances to a [`Lifecycle`] through their stage method tables.
///
/// Actions only hold a weak reference to the instance. If the host drops
/// the instance before a stage fires, that action is skipped.
#[derive(Debug, Clone)]
pub struct ActionBinder {
    lifecycle: Arc<Lifecycle>,
}

impl ActionBinder {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Bind `instance` using its type's own stage methods.
    pub fn bind<T: LifecycleAware>(&self, instance: &Arc<T>) -> Result<BindOutcome> {
        self.bind_with(instance, &T::stage_methods())
    }

    /// Bind an instance that may be absent. `None` is not an error.
    pub fn bind_optional<T: LifecycleAware>(&self, instance: Option<&Arc<T>>) -> Result<BindOutcome> {
        match instance {
            Some(instance) => self.bind(instance),
            None => Ok(BindOutcome::default()),
        }
    }

    /// Bind `instance` using an explicit method table.
    ///
    /// See [`Lifecycle::attach`] for the catch-up and all-or-nothing rules.
    pub fn bind_with<T>(&self, instance: &Arc<T>, methods: &StageMethods<T>) -> Result<BindOutcome>
    where
        T: Send + Sync + 'static,
    {
        let type_name = short_type_name::<T>();
        let actions = self.actions_for(instance, methods, type_name);
        let outcome = self.lifecycle.attach(type_name, actions)?;
        log::debug!(
            "Bound {}: {} registered, {} caught up",
            type_name,
            outcome.registered,
            outcome.caught_up
        );
        Ok(outcome)
    }

    fn actions_for<T>(&self, instance: &Arc<T>, methods: &StageMethods<T>, type_name: &'static str) -> Vec<Action>
    where
        T: Send + Sync + 'static,
    {
        methods
            .iter()
            .map(|method| {
                let target: Weak<T> = Arc::downgrade(instance);
                let method = method.clone();
                let stage = method.stage().clone();
                let name = method.name();
                Action::from_fn(stage, name, move |stage| match target.upgrade() {
                    Some(target) => method.call(&target),
                    None => {
                        log::debug!("Skipping '{}::{}' for stage '{}': instance dropped", type_name, name, stage);
                        Ok(())
                    }
                })
            })
            .collect()
    }
}
