mod demo;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use lifecycle_core::kernel::constants::{APP_NAME, APP_VERSION, CONFIG_ENV_VAR};
use lifecycle_core::{
    ActionError, Error, Lifecycle, LifecycleAware, LifecycleConfig, LifecycleProvider, Listener, Preset, Result,
    Stage,
};
use log::{error, info};

use crate::demo::DemoService;

/// Lifecycle: ordered startup and shutdown for long-running processes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Lifecycle configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Use a predefined stage set
    #[arg(long, global = true, value_enum)]
    preset: Option<PresetArg>,

    /// Log at debug level and report every action invocation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the ordered stage set and which stages allow catch-up
    Stages,
    /// Drive the demo service through the lifecycle
    Run {
        /// Stage to execute to (default: the terminal stage, or the one before it with --hold)
        #[arg(long)]
        to: Option<String>,

        /// After reaching the target, wait for Ctrl-C and then shut down
        #[arg(long)]
        hold: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Standard,
    ServiceDiscovery,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Standard => Preset::Standard,
            PresetArg::ServiceDiscovery => Preset::ServiceDiscovery,
        }
    }
}

/// Prints each stage as it is dispatched.
struct StageTracer;

impl Listener for StageTracer {
    fn on_stage(&self, stage: &Stage) -> std::result::Result<(), ActionError> {
        println!("stage: {}", stage);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Handle simple ping command
    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }
    info!("{} v{}", APP_NAME, APP_VERSION);

    let lifecycle = match build_lifecycle(&args) {
        Ok(lifecycle) => Arc::new(lifecycle),
        Err(e) => {
            error!("Failed to build lifecycle: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        None | Some(Commands::Stages) => {
            print_stages(&lifecycle);
            Ok(())
        }
        Some(Commands::Run { to, hold }) => run(lifecycle, to, hold).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} failed: {}", APP_NAME, e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_lifecycle(args: &CliArgs) -> Result<Lifecycle> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            LifecycleConfig::load(path)?
        }
        None => LifecycleConfig::default(),
    };
    if let Some(preset) = args.preset {
        config.preset = Some(preset.into());
    }
    config.verbose |= args.verbose;
    Lifecycle::from_config(&config)
}

fn print_stages(lifecycle: &Lifecycle) {
    let stages = lifecycle.stages();
    println!("{} stages, catch-up policy {:?}", stages.len(), lifecycle.catch_up_policy());
    for (ordinal, (stage, eligible)) in lifecycle.catch_up_policy().table(stages).into_iter().enumerate() {
        let mark = if eligible { "catch-up" } else { "" };
        println!("{:>3}  {:<12} {}", ordinal, stage.name(), mark);
    }
}

async fn run(lifecycle: Arc<Lifecycle>, to: Option<String>, hold: bool) -> Result<()> {
    let stages = lifecycle.stages();
    let terminal = stages.last().clone();
    let target = match to {
        Some(name) => {
            let stage = Stage::new(name);
            stages.ordinal(&stage)?;
            stage
        }
        None if hold && stages.len() > 1 => stages.get(stages.len() - 2).cloned().unwrap_or_else(|| terminal.clone()),
        None => terminal.clone(),
    };

    let every_stage: Vec<Stage> = stages.iter().cloned().collect();
    lifecycle.add_shared_listener(&every_stage, Arc::new(StageTracer))?;

    // Only bind the demo methods for stages this lifecycle knows about
    let methods = DemoService::stage_methods().retain(|stage| lifecycle.stages().contains(stage));
    let provider = LifecycleProvider::with_methods(Arc::clone(&lifecycle), methods, || {
        Some(Arc::new(DemoService::default()))
    });
    let service = provider
        .get()?
        .ok_or_else(|| Error::Other("demo service factory produced nothing".to_string()))?;

    execute_to(&lifecycle, target).await?;
    info!("Demo service running: {}", service.is_running());

    if hold && !lifecycle.is_terminal() {
        println!("holding at stage '{}', press Ctrl-C to shut down", describe(&lifecycle));
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Other(format!("failed to listen for Ctrl-C: {e}")))?;
        info!("Shutdown requested");
        execute_to(&lifecycle, terminal).await?;
    }

    println!("lifecycle at stage '{}'", describe(&lifecycle));
    Ok(())
}

/// Walk on a blocking thread; actions are synchronous and may block.
async fn execute_to(lifecycle: &Arc<Lifecycle>, target: Stage) -> Result<()> {
    let lifecycle = Arc::clone(lifecycle);
    tokio::task::spawn_blocking(move || lifecycle.execute_to(&target))
        .await
        .map_err(|e| Error::Other(format!("stage walk aborted: {e}")))?
}

fn describe(lifecycle: &Lifecycle) -> String {
    lifecycle
        .current_stage()
        .map(|stage| stage.to_string())
        .unwrap_or_else(|| "not started".to_string())
}
