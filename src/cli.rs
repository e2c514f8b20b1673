//! Command-line argument parsing for sqlpilot.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sqlpilot::config::Config;

/// Answers natural-language questions with self-correcting SQL.
#[derive(Parser, Debug)]
#[command(name = "sqlpilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// PostgreSQL connection string (overrides DATABASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Ollama base URL (overrides OLLAMA_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub ollama_url: Option<String>,

    /// Model name (overrides LLM_MODEL)
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Maximum regeneration attempts (overrides MAX_RETRIES)
    #[arg(long, global = true, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Enable debug logging for sqlpilot
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP job server
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Answer one question and exit
    Ask {
        /// The question, in plain language
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Earlier conversation turns, oldest first
        #[arg(long = "history", value_name = "TURN")]
        history: Vec<String>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flag overrides on top of `config`. Flags win over everything.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        if let Some(url) = &self.ollama_url {
            config.llm.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.workflow.max_retries = max_retries;
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}
