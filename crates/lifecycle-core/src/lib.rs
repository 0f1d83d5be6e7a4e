//! Ordered startup and shutdown for long-running processes.
//!
//! Components register actions against named stages; the [`Lifecycle`]
//! walks its [`StageSet`] forward on [`Lifecycle::execute_to`], running each
//! stage's actions exactly once and in order. Objects created after some
//! stages already fired are bound through [`ActionBinder`] or
//! [`LifecycleProvider`], which catch up eligible stages or refuse the object.
//!
//! ```
//! use std::sync::Arc;
//! use lifecycle_core::{Lifecycle, Stage};
//!
//! let lifecycle = Arc::new(Lifecycle::standard());
//! lifecycle.add_listener(Stage::START, |stage: &Stage| {
//!     println!("entered {stage}");
//!     Ok(())
//! })?;
//! lifecycle.execute_to(&Stage::START)?;
//! assert_eq!(lifecycle.current_stage(), Some(Stage::START));
//! # Ok::<(), lifecycle_core::Error>(())
//! ```
pub mod binding;
pub mod config;
pub mod kernel;
pub mod stage_manager;

// Re-export key public types for easier use by the binary and hosts
pub use binding::{ActionBinder, LifecycleAware, LifecycleProvider, StageMethods};
pub use config::{ConfigFormat, LifecycleConfig, Preset};
pub use kernel::{BindOutcome, Error, Lifecycle, LifecycleBuilder, Result};
pub use stage_manager::{Action, ActionError, CatchUpPolicy, Listener, Stage, StageSet};
