//! # Lifecycle Core Kernel
//!
//! The `kernel` module holds the lifecycle engine itself and the pieces every
//! other module leans on.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Lifecycle Engine**: [`Lifecycle`](lifecycle::Lifecycle) tracks the current stage,
//!   walks the stage set forward on `execute_to`, and dispatches registered actions.
//!   Built directly or through [`LifecycleBuilder`](lifecycle::LifecycleBuilder).
//! - **Core Constants**: stage names and environment variables, in `constants`.
//! - **Error Handling**: the crate-wide [`Error`](error::Error) and `Result` alias in `error`.
pub mod constants;
pub mod error;
pub mod lifecycle;

pub use error::{Error, Result};
pub use lifecycle::{BindOutcome, Lifecycle, LifecycleBuilder};

// Test module declaration
#[cfg(test)]
mod tests;
