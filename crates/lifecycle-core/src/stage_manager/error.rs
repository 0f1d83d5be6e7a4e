//! # Lifecycle Core Stage Manager Errors
//!
//! Defines error types specific to stage sets and their ordering.
//!
//! This module includes [`StageSystemError`], raised when a stage set is
//! malformed at construction time or when an operation names a stage the
//! ordering does not know about.
use thiserror::Error;

use crate::stage_manager::Stage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageSystemError {
    #[error("Stage '{stage}' is not part of this stage set")]
    UnknownStage { stage: Stage },

    #[error("Stage '{stage}' appears more than once in the stage set")]
    DuplicateStage { stage: Stage },

    #[error("Stages '{first}' and '{second}' share ordinal {ordinal}")]
    DuplicateOrdinal { ordinal: i64, first: Stage, second: Stage },

    #[error("A stage set must contain at least one stage")]
    EmptyStageSet,

    #[error("Precedence constraint references stage '{stage}' which is not declared")]
    UnknownPrecedenceStage { stage: Stage },

    #[error("Dependency cycle detected between stages. Path: {cycle_path:?}")]
    DependencyCycleDetected { cycle_path: Vec<Stage> },

    #[error("Precedence constraints do not define a total order: {candidates:?} could each come next")]
    AmbiguousOrder { candidates: Vec<Stage> },

    #[error("Catch-up policy names stage '{stage}' which is not part of the stage set")]
    UnknownCatchUpStage { stage: Stage },

    #[error("Inconsistent stage definition: {reason}")]
    MixedStageDefinition { reason: String },
}
