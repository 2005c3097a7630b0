//! scaffolder CLI
//!
//! Runs a single template action against a local workspace, keeping
//! checkpoint state in SQLite so a failed run can be retried with the same
//! run id.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scaffolder::{derive_run_id, ActionContext, ActionRegistry, ScmIntegrations};
use scaffolder_checkpoint::{
    CheckpointExecutor, CheckpointRecord, CheckpointStore, InMemoryCheckpointStore, RunId,
    SqliteCheckpointStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use utils::{get_env_bool_or, get_env_or, AppConfig};

#[derive(Parser)]
#[command(name = "scaffolder")]
#[command(about = "Run checkpointed scaffolder actions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an action
    Run {
        /// Action id, e.g. publish:bitbucketCloud
        action_id: String,

        /// JSON file with the action input
        #[arg(short, long)]
        input: PathBuf,

        /// Workspace directory holding the content to publish
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// App config file (YAML or JSON)
        #[arg(short, long, env = "SCAFFOLDER_CONFIG")]
        config: Option<PathBuf>,

        /// Checkpoint store: a sqlite URL, or "memory"
        #[arg(long, env = "SCAFFOLDER_STATE", default_value = "sqlite:scaffolder-state.db")]
        state: String,

        /// Run id; derived from the action id and repoUrl when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Only report what would happen; also enabled by SCAFFOLDER_DRY_RUN
        #[arg(long)]
        dry_run: bool,
    },

    /// List registered actions
    List,

    /// Show the checkpoints recorded for a run
    Checkpoints {
        run_id: String,

        #[arg(long, env = "SCAFFOLDER_STATE", default_value = "sqlite:scaffolder-state.db")]
        state: String,
    },

    /// Delete the checkpoints recorded for a run
    Forget {
        run_id: String,

        #[arg(long, env = "SCAFFOLDER_STATE", default_value = "sqlite:scaffolder-state.db")]
        state: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = get_env_or("RUST_LOG", "info");
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            action_id,
            input,
            workspace,
            config,
            state,
            run_id,
            dry_run,
        } => {
            let config = Arc::new(load_config(config.as_deref())?);
            let integrations = Arc::new(ScmIntegrations::from_config(&config)?);
            let registry = ActionRegistry::builtin(integrations, config)?;

            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("reading input file {}", input.display()))?;
            let input: serde_json::Value =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

            let run_id = match run_id {
                Some(id) => RunId::new(id)?,
                None => derive_run_id(&action_id, &input)?,
            };
            tracing::info!("Run id: {}", run_id);

            let store = open_store(&state).await?;
            let executor = CheckpointExecutor::new(store, run_id);
            let dry_run = dry_run || get_env_bool_or("SCAFFOLDER_DRY_RUN", false);
            let mut ctx = ActionContext::new(input, workspace, executor).with_dry_run(dry_run);

            registry.execute(&action_id, &mut ctx).await?;
            println!("{}", serde_json::to_string_pretty(ctx.outputs())?);
        }
        Commands::List => {
            let registry = ActionRegistry::builtin(
                Arc::new(ScmIntegrations::default()),
                Arc::new(AppConfig::empty()),
            )?;
            for action in registry.list_metadata() {
                let dry_run = if action.supports_dry_run { " (dry run)" } else { "" };
                println!("{}{}\n    {}", action.id, dry_run, action.description);
            }
        }
        Commands::Checkpoints { run_id, state } => {
            let records = list_checkpoints(&state, run_id).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Forget { run_id, state } => {
            let run_id = forget_run(&state, run_id).await?;
            println!("Forgot run {}", run_id);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!("Loading app config from {}", path.display());
            AppConfig::load(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => {
            tracing::warn!("No app config given, using default integrations");
            Ok(AppConfig::empty())
        }
    }
}

async fn open_store(state: &str) -> anyhow::Result<Arc<dyn CheckpointStore>> {
    if state == "memory" {
        tracing::warn!("Checkpoints are kept in memory and lost when the process exits");
        return Ok(Arc::new(InMemoryCheckpointStore::new()));
    }
    if !state.starts_with("sqlite:") {
        bail!("unsupported checkpoint state '{}', expected a sqlite: URL or \"memory\"", state);
    }
    let store = SqliteCheckpointStore::connect(state)
        .await
        .with_context(|| format!("opening checkpoint store {}", state))?;
    Ok(Arc::new(store))
}

async fn list_checkpoints(state: &str, run_id: String) -> anyhow::Result<Vec<CheckpointRecord>> {
    let store = open_store(state).await?;
    Ok(store.list(&RunId::new(run_id)?).await?)
}

async fn forget_run(state: &str, run_id: String) -> anyhow::Result<RunId> {
    let store = open_store(state).await?;
    let run_id = RunId::new(run_id)?;
    store.delete_run(&run_id).await?;
    Ok(run_id)
}
