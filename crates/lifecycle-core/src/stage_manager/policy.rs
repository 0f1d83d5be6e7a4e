use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::{Stage, StageSet};

/// Decides which already-passed stages may still run for an object that was
/// created after they fired.
///
/// A stage that is not eligible turns late binding into a hard failure: the
/// object's method was meant to run before anyone could observe it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatchUpPolicy {
    /// Only the earliest stage of the set may be caught up
    #[default]
    FirstStage,
    /// No stage may be caught up
    Never,
    /// Every stage may be caught up
    Always,
    /// Exactly the listed stages may be caught up
    Only(Vec<Stage>),
}

impl CatchUpPolicy {
    /// Check whether `stage` may be caught up under this policy.
    pub fn is_eligible(&self, stages: &StageSet, stage: &Stage) -> bool {
        match self {
            CatchUpPolicy::FirstStage => stages.first() == stage,
            CatchUpPolicy::Never => false,
            CatchUpPolicy::Always => true,
            CatchUpPolicy::Only(eligible) => eligible.contains(stage),
        }
    }

    /// Ensure every stage the policy names exists in `stages`.
    pub fn validate(&self, stages: &StageSet) -> Result<(), StageSystemError> {
        if let CatchUpPolicy::Only(eligible) = self {
            if let Some(stage) = eligible.iter().find(|s| !stages.contains(s)) {
                return Err(StageSystemError::UnknownCatchUpStage { stage: stage.clone() });
            }
        }
        Ok(())
    }

    /// The eligibility table for `stages`, in stage order.
    pub fn table<'a>(&self, stages: &'a StageSet) -> Vec<(&'a Stage, bool)> {
        stages.iter().map(|stage| (stage, self.is_eligible(stages, stage))).collect()
    }
}
