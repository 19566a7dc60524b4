//! TaskPilot CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Run one task and stream its steps
//! - `config`  — Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "taskpilot",
    about = "TaskPilot — plan, act, observe, answer",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single task and stream each step
    Run {
        /// The task to perform
        task: String,

        /// Recorded driver responses (JSON) to play back
        #[arg(short, long)]
        replay: PathBuf,

        /// Extra information handed to the agent with the task
        #[arg(short, long)]
        input: Option<String>,

        /// Override agent.max_iterations
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print only the final answer
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            task,
            replay,
            input,
            max_iterations,
            quiet,
        } => {
            commands::run::run(commands::run::RunArgs {
                task,
                replay,
                input,
                max_iterations,
                quiet,
            })
            .await?
        }
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path()?
            } else {
                commands::config_cmd::show()?
            }
        }
    }

    Ok(())
}
