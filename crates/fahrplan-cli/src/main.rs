mod config;
mod decide_cmd;
mod plan_cmds;
mod status_cmd;
mod tasks_cmd;
mod transition_cmd;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use fahrplan_core::session::PlanSession;
use fahrplan_engine::EngineClient;

use config::FahrplanConfig;

#[derive(Parser)]
#[command(name = "fahrplan", about = "Life-event plan companion")]
struct Cli {
    /// Plan engine URL (overrides FAHRPLAN_ENGINE_URL env var)
    #[arg(long, global = true)]
    engine_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fahrplan config file
    Init {
        /// Plan engine URL
        #[arg(long, default_value = "http://localhost:8000")]
        url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create a new plan from a template
    Create {
        /// Template key (e.g. geburt)
        template: String,
        /// Initial facts as key=value pairs (repeatable)
        #[arg(long = "fact")]
        facts: Vec<String>,
    },
    /// Show plan progress, next deadlines, and critical tasks
    Status {
        /// Plan ID
        plan_id: String,
    },
    /// List all tasks in display order
    Tasks {
        /// Plan ID
        plan_id: String,
    },
    /// Mark a task done
    Done {
        /// Plan ID
        plan_id: String,
        /// Task key to complete
        task_key: String,
        /// Complete even if prerequisites are unresolved
        #[arg(long)]
        force: bool,
    },
    /// Revert a done task to todo
    Undo {
        /// Plan ID
        plan_id: String,
        /// Task key to reopen
        task_key: String,
    },
    /// Dismiss a task as not applicable
    Dismiss {
        /// Plan ID
        plan_id: String,
        /// Task key to dismiss
        task_key: String,
    },
    /// Resolve a decision task with the chosen option
    Decide {
        /// Plan ID
        plan_id: String,
        /// Decision task key
        task_key: String,
        /// Option key to choose
        option: String,
    },
    /// Retry plan regeneration after a failed decision recompute
    Recompute {
        /// Plan ID
        plan_id: String,
    },
}

/// Execute the `fahrplan init` command: write config file.
fn cmd_init(url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        engine: config::EngineSection {
            url: url.to_string(),
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  engine.url = {url}");

    Ok(())
}

fn parse_plan_id(plan_id_str: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(plan_id_str).with_context(|| format!("invalid plan ID: {plan_id_str}"))
}

async fn load_session(
    cli_url: Option<&str>,
    plan_id_str: &str,
) -> anyhow::Result<PlanSession> {
    let resolved = FahrplanConfig::resolve(cli_url)?;
    let client = EngineClient::new(&resolved.engine)?;
    let plan_id = parse_plan_id(plan_id_str)?;
    PlanSession::load(Arc::new(client), plan_id)
        .await
        .with_context(|| format!("failed to load plan {plan_id}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine_url = cli.engine_url.as_deref();

    match cli.command {
        Commands::Init { url, force } => {
            cmd_init(&url, force)?;
        }
        Commands::Create { template, facts } => {
            let resolved = FahrplanConfig::resolve(engine_url)?;
            let client = EngineClient::new(&resolved.engine)?;
            plan_cmds::run_create(&client, &template, &facts).await?;
        }
        Commands::Status { plan_id } => {
            let session = load_session(engine_url, &plan_id).await?;
            status_cmd::run_status(&session)?;
        }
        Commands::Tasks { plan_id } => {
            let session = load_session(engine_url, &plan_id).await?;
            tasks_cmd::run_tasks(&session)?;
        }
        Commands::Done {
            plan_id,
            task_key,
            force,
        } => {
            let mut session = load_session(engine_url, &plan_id).await?;
            transition_cmd::run_done(&mut session, &task_key, force).await?;
        }
        Commands::Undo { plan_id, task_key } => {
            let mut session = load_session(engine_url, &plan_id).await?;
            transition_cmd::run_undo(&mut session, &task_key).await?;
        }
        Commands::Dismiss { plan_id, task_key } => {
            let mut session = load_session(engine_url, &plan_id).await?;
            transition_cmd::run_dismiss(&mut session, &task_key).await?;
        }
        Commands::Decide {
            plan_id,
            task_key,
            option,
        } => {
            let mut session = load_session(engine_url, &plan_id).await?;
            decide_cmd::run_decide(&mut session, &task_key, &option).await?;
        }
        Commands::Recompute { plan_id } => {
            let mut session = load_session(engine_url, &plan_id).await?;
            decide_cmd::run_recompute(&mut session).await?;
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Test support
// -----------------------------------------------------------------------

#[cfg(test)]
pub mod test_util {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serialize tests that mutate process-wide environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
