//! sqlpilot - natural-language questions answered with self-correcting SQL.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use cli::{Cli, Command};
use sqlpilot::config::Config;
use sqlpilot::db::{self, DatabaseClient};
use sqlpilot::error::AppError;
use sqlpilot::jobs::JobRegistry;
use sqlpilot::llm::{OllamaClient, OllamaConfig};
use sqlpilot::logging;
use sqlpilot::server::{self, AppState};
use sqlpilot::workflow::WorkflowController;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<AppError>() {
            Some(app) => error!("{}: {:#}", app.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    config.database.warn_if_fallback();
    config.database.validated_url()?;
    info!("Database: {}", config.database.display_string());
    let db = db::connect(&config.database)
        .await
        .with_context(|| format!("Failed to prepare pool for {}", config.database.display_string()))?;
    let db: Arc<dyn DatabaseClient> = Arc::new(db);

    let llm = OllamaClient::new(OllamaConfig::from(&config.llm))?;
    if !llm.is_available().await {
        warn!(
            base_url = %config.llm.base_url,
            "Ollama is not reachable yet; requests will fail until it is"
        );
    }
    info!(model = llm.model(), "Using Ollama model");

    let controller = Arc::new(WorkflowController::new(db.clone(), Arc::new(llm), &config.workflow));

    let outcome = match cli.command {
        Command::Serve { .. } => {
            let state = AppState {
                jobs: JobRegistry::new(controller),
            };
            server::serve(&config.server, state).await.map_err(anyhow::Error::from)
        }
        Command::Ask { question, history } => {
            let answer = controller.run_to_completion(question, history).await;
            println!("{}", answer.result);
            if !answer.sql_query.is_empty() {
                println!("\nSQL: {}", answer.sql_query);
            }
            match answer.error {
                Some(err) if err.is_critical() => Err(AppError::connection(err.to_string()).into()),
                _ => Ok(()),
            }
        }
    };

    if let Err(e) = db.close().await {
        warn!(error = %e, "Failed to close database pool");
    }
    outcome
}

/// Builds the effective configuration: defaults, then the TOML file, then
/// the environment, then command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli.config_path();
    info!("Loading config from: {}", path.display());

    let mut config = Config::load_from_file(&path)?;
    config.apply_env_overrides()?;
    cli.apply_overrides(&mut config);
    Ok(config)
}
