use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tokio::sync::watch;

use crate::config::LifecycleConfig;
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::stage_manager::{Action, ActionError, CatchUpPolicy, Listener, ListenerRegistry, Stage, StageSet};

/// Counts reported after handing a batch of actions to the lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Actions registered for stages that have not fired yet
    pub registered: usize,
    /// Actions invoked immediately because their stage had already fired
    pub caught_up: usize,
}

/// Mutable engine state. Never locked while user callbacks run.
struct State {
    /// Ordinal of the last fully completed stage; `None` before the first stage
    current: Option<usize>,
    registry: ListenerRegistry,
    /// Per-stage count of actions already handed out for invocation
    dispatched: Vec<usize>,
    /// Thread holding the transition lock, if any
    walker: Option<ThreadId>,
}

/// The process lifecycle: a forward-only walk through a [`StageSet`].
///
/// One instance exists per process run. It is shared as `Arc<Lifecycle>`
/// between the bootstrap code that drives it and the components that
/// register actions with it.
///
/// Two locks are involved. The transition lock serializes stage walks and
/// catch-up binding; it is held while actions run. The state lock guards the
/// current stage and the registry and is only held for bookkeeping, so an
/// action may itself register listeners or bind new objects.
pub struct Lifecycle {
    stages: StageSet,
    policy: CatchUpPolicy,
    verbose: bool,
    state: Mutex<State>,
    transition: Mutex<()>,
    progress: watch::Sender<Option<Stage>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("stages", &self.stages)
            .field("policy", &self.policy)
            .field("current", &self.current_stage())
            .finish_non_exhaustive()
    }
}

/// Holds the transition lock, or marks that the current thread already holds it.
struct Transition<'a> {
    lifecycle: &'a Lifecycle,
    guard: Option<MutexGuard<'a, ()>>,
}

impl Transition<'_> {
    fn is_nested(&self) -> bool {
        self.guard.is_none()
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        // Clear the walker before the guard field releases the lock
        if self.guard.is_some() {
            self.lifecycle.lock_state_lenient().walker = None;
        }
    }
}

impl Lifecycle {
    /// Create a lifecycle over `stages` with the default catch-up policy.
    pub fn new(stages: StageSet) -> Self {
        let dispatched = vec![0; stages.len()];
        let (progress, _) = watch::channel(None);
        Self {
            stages,
            policy: CatchUpPolicy::default(),
            verbose: false,
            state: Mutex::new(State {
                current: None,
                registry: ListenerRegistry::new(),
                dispatched,
                walker: None,
            }),
            transition: Mutex::new(()),
            progress,
        }
    }

    /// `configure < start < stop`
    pub fn standard() -> Self {
        Self::new(StageSet::standard())
    }

    /// Start building a lifecycle with a custom policy or logging.
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::new()
    }

    /// Build a lifecycle from configuration.
    pub fn from_config(config: &LifecycleConfig) -> Result<Self> {
        config.build()
    }

    /// The ordered stage set this lifecycle walks
    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// The catch-up policy applied to late bindings
    pub fn catch_up_policy(&self) -> &CatchUpPolicy {
        &self.policy
    }

    /// The last fully completed stage, or `None` before the first stage ran.
    pub fn current_stage(&self) -> Option<Stage> {
        let current = self.lock_state_lenient().current;
        current.and_then(|ordinal| self.stages.get(ordinal).cloned())
    }

    /// The stage the next `execute_next` would run, or `None` when terminal.
    pub fn next_stage(&self) -> Option<Stage> {
        let next = match self.lock_state_lenient().current {
            Some(current) => current + 1,
            None => 0,
        };
        self.stages.get(next).cloned()
    }

    /// Whether at least one stage has completed.
    pub fn is_started(&self) -> bool {
        self.lock_state_lenient().current.is_some()
    }

    /// Whether the terminal stage has completed; `execute_to` is a no-op from here on.
    pub fn is_terminal(&self) -> bool {
        self.lock_state_lenient().current == Some(self.stages.len() - 1)
    }

    /// Number of actions registered for a stage.
    pub fn registered_actions(&self, stage: &Stage) -> usize {
        self.lock_state_lenient().registry.count(stage)
    }

    /// Register a callback for `stage`.
    ///
    /// If the stage already fired the callback is caught up immediately when
    /// the policy allows it, otherwise registration fails with
    /// [`Error::LateBinding`].
    pub fn add_listener<F>(&self, stage: Stage, listener: F) -> Result<BindOutcome>
    where
        F: Fn(&Stage) -> std::result::Result<(), ActionError> + Send + Sync + 'static,
    {
        let action = Action::from_fn(stage, constants::LISTENER_OWNER, listener);
        self.attach(constants::LISTENER_OWNER, vec![action])
    }

    /// Register one listener for several stages. It receives the stage that fired.
    pub fn add_shared_listener(&self, stages: &[Stage], listener: Arc<dyn Listener>) -> Result<BindOutcome> {
        let actions = stages
            .iter()
            .map(|stage| Action::new(stage.clone(), constants::LISTENER_OWNER, Arc::clone(&listener)))
            .collect();
        self.attach(constants::LISTENER_OWNER, actions)
    }

    /// Register a single prepared action. Same rules as [`Lifecycle::add_listener`].
    pub fn add_action(&self, action: Action) -> Result<BindOutcome> {
        self.attach(constants::LISTENER_OWNER, vec![action])
    }

    /// Hand a batch of actions belonging to `owner` to the lifecycle.
    ///
    /// All-or-nothing: every action is checked before any is registered or
    /// invoked. Actions for stages still ahead are registered; actions for
    /// stages already passed are invoked now (in stage order) if the policy
    /// allows catch-up. If any passed stage is not eligible, or any catch-up
    /// fails, nothing is registered.
    ///
    /// A batch that only targets stages still ahead is registered under the
    /// state lock alone and never waits for a running walk; an action for the
    /// stage being dispatched joins that dispatch. Only catch-up is
    /// serialized with stage walks.
    pub fn attach(&self, owner: &str, actions: Vec<Action>) -> Result<BindOutcome> {
        if actions.is_empty() {
            return Ok(BindOutcome::default());
        }

        let ordinals = actions
            .iter()
            .map(|action| self.stages.ordinal(action.stage()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        {
            let mut state = self.lock_state()?;
            if ordinals.iter().all(|&ordinal| !has_passed(state.current, ordinal)) {
                let outcome = BindOutcome {
                    registered: actions.len(),
                    caught_up: 0,
                };
                for action in actions {
                    state.registry.register(action);
                }
                return Ok(outcome);
            }
        }

        let _transition = self.enter_transition()?;

        // Re-check: the walk may have moved on while we waited
        let mut pending = Vec::new();
        let mut late = Vec::new();
        {
            let state = self.lock_state()?;
            for (action, ordinal) in actions.into_iter().zip(ordinals) {
                if !has_passed(state.current, ordinal) {
                    pending.push(action);
                    continue;
                }
                if !self.policy.is_eligible(&self.stages, action.stage()) {
                    log::warn!(
                        "Refusing late binding of '{}::{}': stage '{}' has already passed",
                        owner,
                        action.label(),
                        action.stage()
                    );
                    return Err(Error::LateBinding {
                        stage: action.stage().clone(),
                        type_name: owner.to_string(),
                        method: action.label().to_string(),
                    });
                }
                late.push((ordinal, action));
            }
        }

        late.sort_by_key(|(ordinal, _)| *ordinal);
        for (_, action) in &late {
            log::debug!("Catching up '{}::{}' for stage '{}'", owner, action.label(), action.stage());
            self.invoke(action)?;
        }

        let outcome = BindOutcome {
            registered: pending.len(),
            caught_up: late.len(),
        };
        let mut state = self.lock_state()?;
        for action in pending {
            state.registry.register(action);
        }
        Ok(outcome)
    }

    /// Advance through every stage after the current one, up to and including `target`.
    ///
    /// A target at or before the current stage is a no-op. If an action
    /// fails the error is returned immediately and the current stage stays at
    /// the last stage that completed; actions already invoked are not run
    /// again by a later call.
    pub fn execute_to(&self, target: &Stage) -> Result<()> {
        let target_ordinal = self.stages.ordinal(target)?;
        if has_passed(self.lock_state()?.current, target_ordinal) {
            return Ok(());
        }

        let transition = self.enter_transition()?;
        if transition.is_nested() {
            return Err(Error::ReentrantTransition { target: target.clone() });
        }

        loop {
            let next = match self.lock_state()?.current {
                Some(current) if current >= target_ordinal => break,
                Some(current) => current + 1,
                None => 0,
            };
            self.run_stage(next)?;
        }
        Ok(())
    }

    /// Advance exactly one stage. Returns the stage reached, or `None` when
    /// the lifecycle is already terminal.
    pub fn execute_next(&self) -> Result<Option<Stage>> {
        match self.next_stage() {
            Some(next) => {
                self.execute_to(&next)?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    /// Receiver publishing the current stage after each stage completes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Stage>> {
        self.progress.subscribe()
    }

    /// Wait until the lifecycle has reached `stage` or a later one.
    pub async fn wait_for(&self, stage: &Stage) -> Result<()> {
        let target = self.stages.ordinal(stage)?;
        let mut progress = self.progress.subscribe();
        progress
            .wait_for(|current| {
                current
                    .as_ref()
                    .and_then(|reached| self.stages.position(reached))
                    .is_some_and(|reached| reached >= target)
            })
            .await
            .map(|_| ())
            .map_err(|_| Error::Other("lifecycle progress channel closed".to_string()))
    }

    fn run_stage(&self, ordinal: usize) -> Result<()> {
        let stage = self
            .stages
            .get(ordinal)
            .cloned()
            .ok_or_else(|| Error::Other(format!("no stage at ordinal {ordinal}")))?;
        log::info!("Entering stage '{}'", stage);

        // Re-read the sequence each time so actions registered mid-dispatch
        // for this stage are included; completion is recorded under the same lock.
        loop {
            let action = {
                let mut state = self.lock_state()?;
                let index = state.dispatched[ordinal];
                match state.registry.action_at(&stage, index).cloned() {
                    Some(action) => {
                        state.dispatched[ordinal] += 1;
                        action
                    }
                    None => {
                        state.current = Some(ordinal);
                        break;
                    }
                }
            };
            self.invoke(&action)?;
        }

        self.progress.send_replace(Some(stage.clone()));
        log::info!("Stage '{}' complete", stage);
        Ok(())
    }

    fn invoke(&self, action: &Action) -> Result<()> {
        if self.verbose {
            log::info!("Running '{}' for stage '{}'", action.label(), action.stage());
        } else {
            log::debug!("Running '{}' for stage '{}'", action.label(), action.stage());
        }
        action.invoke().map_err(|source| {
            log::error!("Action '{}' failed during stage '{}': {}", action.label(), action.stage(), source);
            Error::ActionFailed {
                stage: action.stage().clone(),
                action: action.label().to_string(),
                source,
            }
        })
    }

    fn enter_transition(&self) -> Result<Transition<'_>> {
        let me = thread::current().id();
        if self.lock_state()?.walker == Some(me) {
            return Ok(Transition { lifecycle: self, guard: None });
        }

        // A panicking action poisons this lock; the bookkeeping it protects
        // lives in `state`, so the lock itself is safe to reuse.
        let guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        self.lock_state()?.walker = Some(me);
        Ok(Transition {
            lifecycle: self,
            guard: Some(guard),
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::LockPoisoned { component: "state" })
    }

    // Read-only accessors and cleanup tolerate poisoning
    fn lock_state_lenient(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether the stage at `ordinal` has already completed.
fn has_passed(current: Option<usize>, ordinal: usize) -> bool {
    current.is_some_and(|current| ordinal <= current)
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builder for [`Lifecycle`] with a custom stage set, catch-up policy or logging.
#[derive(Debug, Default)]
pub struct LifecycleBuilder {
    stages: Option<StageSet>,
    policy: CatchUpPolicy,
    verbose: bool,
}

impl LifecycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage set to walk; defaults to the standard set.
    pub fn stages(mut self, stages: StageSet) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Catch-up policy; defaults to [`CatchUpPolicy::FirstStage`].
    pub fn catch_up(mut self, policy: CatchUpPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Log every action invocation at `info` instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate the policy against the stage set and build the lifecycle.
    pub fn build(self) -> Result<Lifecycle> {
        let stages = self.stages.unwrap_or_default();
        self.policy.validate(&stages)?;

        let mut lifecycle = Lifecycle::new(stages);
        lifecycle.policy = self.policy;
        lifecycle.verbose = self.verbose;
        log::debug!("Built lifecycle over stages {:?}", lifecycle.stages);
        Ok(lifecycle)
    }
}
