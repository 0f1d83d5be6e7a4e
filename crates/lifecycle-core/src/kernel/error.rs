//! # Lifecycle Core Errors
//!
//! Defines the crate-wide [`Error`] type.
//!
//! Subsystem errors ([`StageSystemError`], [`ConfigError`]) convert into it
//! with `?`. The remaining variants are raised by the engine itself: a late
//! binding that cannot be caught up, an action that failed during dispatch,
//! and misuse of the transition lock.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::{ActionError, Stage};

#[derive(Debug, ThisError)]
pub enum Error {
    /// A stage set was malformed, or an operation named an unknown stage
    #[error("Stage system error: {0}")]
    StageSystem(#[from] StageSystemError),

    /// Lifecycle configuration could not be read or understood
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An object needed an already-passed, non catch-up stage to run for it
    #[error("Cannot bind '{type_name}::{method}': stage '{stage}' has already passed and cannot be caught up")]
    LateBinding {
        stage: Stage,
        type_name: String,
        method: String,
    },

    /// A registered action returned an error while its stage was dispatched
    #[error("Action '{action}' failed during stage '{stage}': {source}")]
    ActionFailed {
        stage: Stage,
        action: String,
        #[source]
        source: ActionError,
    },

    /// `execute_to` was called from inside an action of the running transition
    #[error("Cannot execute to stage '{target}' from inside a running stage transition")]
    ReentrantTransition { target: Stage },

    /// A lock guarding lifecycle state was poisoned by a panic
    #[error("Lifecycle lock '{component}' is poisoned")]
    LockPoisoned { component: &'static str },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// The stage this error is about, when there is one.
    pub fn stage(&self) -> Option<&Stage> {
        match self {
            Error::LateBinding { stage, .. }
            | Error::ActionFailed { stage, .. }
            | Error::ReentrantTransition { target: stage } => Some(stage),
            Error::StageSystem(StageSystemError::UnknownStage { stage }) => Some(stage),
            _ => None,
        }
    }

    /// True for failures caused by binding an object too late.
    pub fn is_late_binding(&self) -> bool {
        matches!(self, Error::LateBinding { .. })
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;
