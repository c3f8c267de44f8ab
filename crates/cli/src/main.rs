//! toolpilot CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive chat or single-message mode
//! - `init`: Write a default config file
//! - `tools`: List the tools the model can call

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(
    name = "toolpilot",
    about = "toolpilot — a chat agent that works on the files in your workspace",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.toolpilot/config.toml
    #[arg(long, global = true, env = "TOOLPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the tools may read and write (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Override the configured model
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A .env file may carry API keys; it must be loaded before clap reads env vars.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing. Logs go to stderr so replies on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let globals = GlobalArgs {
        config: cli.config,
        workspace: cli.workspace,
        model: cli.model,
    };

    match cli.command {
        Commands::Chat { message } => commands::chat::run(&globals, message).await?,
        Commands::Init { force } => commands::init::run(&globals, force)?,
        Commands::Tools => commands::tools::run(&globals)?,
    }

    Ok(())
}
