mod interactive;
mod requests;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use falcon_agent::AgentLoop;
use falcon_config::FalconConfig;
use falcon_exec::{approval_channel, ConfirmationManager, ToolExecutor};
use falcon_llm::{LlmClient, OllamaClient, OpenRouterClient};
use falcon_memory::{read_recent_sessions, MemoryStore, SessionLog};
use falcon_prompt::{build_system_prompt, PromptInputs};
use falcon_workspace::{PersistenceManager, ResponseManager, VariableStore, WorkspaceLayout};

#[derive(Debug, Parser)]
#[command(name = "falcon", version, about = "An API testing agent that talks ReAct over your HTTP surface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Pre-selects a framework for the prompt's search hints (e.g. "rails").
    #[arg(long, global = true)]
    framework: Option<String>,

    /// Skips optional spec auto-ingest on startup.
    #[arg(long, global = true)]
    no_index: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Launches an interactive session, or executes a saved request directly.
    Run {
        /// Name of a saved request to execute non-interactively.
        #[arg(long)]
        request: Option<String>,
        /// Environment to load variables from before executing the request.
        #[arg(long = "env")]
        env: Option<String>,
    },
}

const CONFIG_ERROR: u8 = 2;
const GENERIC_ERROR: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run().await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(GENERIC_ERROR)
            }
        }
        Err(err) => {
            eprintln!("falcon: {err}");
            ExitCode::from(CONFIG_ERROR)
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    if cli.no_index {
        tracing::debug!("--no-index: skipping optional spec auto-ingest");
    }

    let project_root = std::env::current_dir()?;
    let layout = Arc::new(WorkspaceLayout::bootstrap(project_root.join(".falcon"))?);
    init_logging(&layout)?;

    let config_path = layout.config_path();
    let mut config = FalconConfig::load_from(&config_path)?;
    if !config_path.exists() {
        config.save_to(&config_path)?;
    }

    let variables = Arc::new(VariableStore::load(layout.variables_path())?);
    let responses = Arc::new(ResponseManager::new());
    let persistence = Arc::new(PersistenceManager::new(layout.clone()));
    let memory = Arc::new(MemoryStore::load(layout.memory_path())?);

    let mut session_log = SessionLog::start(layout.history_path(), layout.sessions_dir());
    let session_id = session_log.session_id().to_string();

    let registry = falcon_tools::default_registry(
        project_root.clone(),
        variables.clone(),
        responses.clone(),
        persistence.clone(),
        memory.clone(),
        session_id,
    );
    let (confirmation_tx, confirmation_rx) = approval_channel();
    let confirmation_manager = Arc::new(ConfirmationManager::new(confirmation_rx));
    let executor = ToolExecutor::new(Arc::new(registry), config.safety.approval_mode)
        .with_confirmation(confirmation_tx);

    match cli.command.unwrap_or(Commands::Run { request: None, env: None }) {
        Commands::Run { request: Some(name), env } => {
            let success = requests::run_saved_request(&executor, &persistence, &variables, &name, env.as_deref()).await?;
            Ok(success)
        }
        Commands::Run { request: None, .. } => {
            let framework = cli.framework.clone().or_else(|| {
                if config.agent.framework.is_empty() {
                    None
                } else {
                    Some(config.agent.framework.clone())
                }
            });

            let llm = build_llm_client(&config)?;
            let recent_sessions = read_recent_sessions(&layout.history_path(), 3);
            let memory_summary = memory.get_compact_summary(&recent_sessions);
            let system_prompt = build_system_prompt(&PromptInputs {
                workspace_root: &project_root,
                manifest: &layout.read_manifest(),
                memory_summary: &memory_summary,
                framework: framework.as_deref(),
                tool_specs: &executor.registry().list_specs(),
                verbose_tools: false,
            });

            info!(provider = %config.llm.provider, model = %config.llm.model, "starting interactive session");
            let agent = AgentLoop::new(llm, executor, system_prompt, config.tools.clone());

            interactive::run_interactive_session(&agent, &mut session_log, confirmation_manager).await?;
            session_log.end(None)?;
            Ok(true)
        }
    }
}

fn build_llm_client(config: &FalconConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    match config.llm.provider.as_str() {
        "openrouter" => {
            let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
            Ok(Arc::new(OpenRouterClient::new(config.llm.base_url.clone(), api_key, config.llm.model.clone())))
        }
        _ => Ok(Arc::new(OllamaClient::new(config.llm.base_url.clone(), config.llm.model.clone()))),
    }
}

fn init_logging(layout: &WorkspaceLayout) -> anyhow::Result<()> {
    let log_dir: PathBuf = layout.logs_dir();
    let file_appender = tracing_appender::rolling::daily(log_dir, "falcon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leaked deliberately: the guard must outlive every tracing call made
    // for the remainder of the process.
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("falcon=info".parse()?))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(())
}
