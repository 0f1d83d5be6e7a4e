use std::collections::HashMap;
use std::fmt;

use crate::stage_manager::{Action, Stage};

/// Registry mapping each stage to the actions that run when it fires.
///
/// Insertion order is invocation order within a stage. The registry knows
/// nothing about which stages have already fired; the lifecycle engine owns
/// that decision.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Registered actions by stage
    actions: HashMap<Stage, Vec<Action>>,
}

// Manual Debug implementation
impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Per-stage counts are enough for diagnostics
        let counts: HashMap<&str, usize> = self
            .actions
            .iter()
            .map(|(stage, actions)| (stage.name(), actions.len()))
            .collect();
        f.debug_struct("ListenerRegistry").field("actions", &counts).finish()
    }
}

impl ListenerRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self { actions: HashMap::new() }
    }

    /// Append an action to its stage's sequence
    pub fn register(&mut self, action: Action) {
        self.actions.entry(action.stage().clone()).or_default().push(action);
    }

    /// Actions registered for exactly this stage, in registration order
    pub fn actions_for(&self, stage: &Stage) -> &[Action] {
        self.actions.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The action at `index` within a stage's sequence
    pub fn action_at(&self, stage: &Stage, index: usize) -> Option<&Action> {
        self.actions.get(stage).and_then(|actions| actions.get(index))
    }

    /// Number of actions registered for a stage
    pub fn count(&self, stage: &Stage) -> usize {
        self.actions.get(stage).map_or(0, Vec::len)
    }

    /// Number of actions across all stages
    pub fn total(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    /// Stages that have at least one action
    pub fn stages_with_actions(&self) -> Vec<&Stage> {
        self.actions
            .iter()
            .filter(|(_, actions)| !actions.is_empty())
            .map(|(stage, _)| stage)
            .collect()
    }
}
