//! Process-wide logging for the `lifecycle` binary.
//!
//! The core library logs through the `log` facade. Those records are
//! forwarded into `tracing` and printed by a `fmt` subscriber on stderr,
//! keeping stdout free for command output.
use std::error::Error;

use lifecycle_core::kernel::constants::LOG_ENV_VAR;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `LIFECYCLE_LOG` takes an env-filter
/// directive and wins over the default level.
pub fn init(verbose: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_log::LogTracer::init()?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Logging initialized (default level: {})", default_level);
    Ok(())
}
