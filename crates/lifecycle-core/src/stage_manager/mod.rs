//! # Lifecycle Core Stage Manager
//!
//! Everything the engine needs to know about stages and what runs in them:
//!
//! - [`Stage`]: a named point in the process lifecycle.
//! - [`StageSet`](ordering::StageSet): the validated, totally ordered sequence of stages.
//! - [`CatchUpPolicy`](policy::CatchUpPolicy): which already-passed stages may still be
//!   run for objects created late.
//! - [`Action`](action::Action) / [`Listener`](action::Listener): the callbacks bound to a stage.
//! - [`ListenerRegistry`](registry::ListenerRegistry): stage → ordered actions.
pub mod action;
pub mod error;
pub mod ordering;
pub mod policy;
pub mod registry;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::constants;

/// A named point in the process lifecycle.
///
/// Stages carry no ordering of their own; their position is defined by the
/// [`StageSet`] they are part of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(Cow<'static, str>);

impl Stage {
    /// Configuration is read and validated; nothing is running yet.
    pub const CONFIGURE: Stage = Stage::from_static(constants::CONFIGURE_STAGE);
    /// Services start.
    pub const START: Stage = Stage::from_static(constants::START_STAGE);
    /// The process announces itself to service discovery.
    pub const ANNOUNCE: Stage = Stage::from_static(constants::ANNOUNCE_STAGE);
    /// The process withdraws from service discovery.
    pub const UNANNOUNCE: Stage = Stage::from_static(constants::UNANNOUNCE_STAGE);
    /// Services stop.
    pub const STOP: Stage = Stage::from_static(constants::STOP_STAGE);

    /// Create a stage from a static name without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Stage(Cow::Borrowed(name))
    }

    /// Create a stage from any name.
    pub fn new(name: impl Into<String>) -> Self {
        Stage(Cow::Owned(name.into()))
    }

    /// The stage name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Stage {
    fn from(name: &'static str) -> Self {
        Stage::from_static(name)
    }
}

impl From<String> for Stage {
    fn from(name: String) -> Self {
        Stage::new(name)
    }
}

// Re-export important types
pub use action::{Action, ActionError, Listener};
pub use error::StageSystemError;
pub use ordering::StageSet;
pub use policy::CatchUpPolicy;
pub use registry::ListenerRegistry;

// Test module declaration
#[cfg(test)]
mod tests;
