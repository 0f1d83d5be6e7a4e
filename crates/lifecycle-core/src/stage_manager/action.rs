use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::stage_manager::Stage;

/// Error type returned by action callbacks.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Callback invoked when a stage is hit. A listener can be registered for
/// several stages; it receives the stage that fired.
pub trait Listener: Send + Sync {
    fn on_stage(&self, stage: &Stage) -> Result<(), ActionError>;
}

impl<F> Listener for F
where
    F: Fn(&Stage) -> Result<(), ActionError> + Send + Sync,
{
    fn on_stage(&self, stage: &Stage) -> Result<(), ActionError> {
        self(stage)
    }
}

/// A callback bound to exactly one stage.
///
/// Cloning an action is cheap and shares the callback; the engine invokes
/// each registered action at most once.
#[derive(Clone)]
pub struct Action {
    stage: Stage,
    label: Cow<'static, str>,
    listener: Arc<dyn Listener>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("stage", &self.stage)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Action {
    /// Create an action for `stage`. The label shows up in logs and errors.
    pub fn new(stage: Stage, label: impl Into<Cow<'static, str>>, listener: Arc<dyn Listener>) -> Self {
        Self {
            stage,
            label: label.into(),
            listener,
        }
    }

    /// Convenience constructor for closures.
    pub fn from_fn<F>(stage: Stage, label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Stage) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self::new(stage, label, Arc::new(f))
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the callback.
    pub fn invoke(&self) -> Result<(), ActionError> {
        self.listener.on_stage(&self.stage)
    }
}
