//! `firmaudit` -- CLI binary for the company audit pipeline.
//!
//! Provides the following subcommands:
//!
//! - `firmaudit run` -- Run the four-stage audit for one company.
//! - `firmaudit status` -- Show providers, credentials and stage bindings.
//! - `firmaudit config show` -- Print the resolved configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

/// Multi-model company audit pipeline.
#[derive(Parser)]
#[command(name = "firmaudit", about = "Multi-model company audit pipeline", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the audit pipeline for a company.
    Run(commands::run::RunArgs),

    /// Show providers, credentials and the binding each stage would use.
    Status(commands::status::StatusArgs),

    /// Inspect the resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

/// Subcommands for `firmaudit config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the full resolved configuration.
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // API keys usually live in a local .env file.
    let _ = dotenvy::dotenv();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(commands::EXIT_SETUP_FAILURE)
        }
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Run(args) => {
            let outcome = commands::run::run(args).await?;
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Commands::Status(args) => {
            commands::status::run(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => {
                let loaded = commands::load_config(config.as_deref()).await?;
                commands::config_cmd::config_show(&loaded.config)?;
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}
