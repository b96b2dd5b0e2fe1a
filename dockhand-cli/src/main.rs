//! Dockhand CLI
//!
//! Command-line interface for running, planning and validating image
//! publishing workflows.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use dockhand_lua::DEFAULT_IMAGE_TAG;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Build and publish a container image under a fixed tag", long_about = None)]
struct Cli {
    /// Workflow definition file (defaults to ./dockhand.lua, then the built-in workflow)
    #[arg(long, short = 'w', global = true, env = "DOCKHAND_WORKFLOW")]
    workflow: Option<PathBuf>,

    /// Image tag for the built-in workflow
    #[arg(long, global = true, env = "DOCKHAND_IMAGE_TAG", default_value = DEFAULT_IMAGE_TAG)]
    tag: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dockhand_runner=info,dockhand_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        workflow: cli.workflow,
        tag: cli.tag,
    };

    handle_command(cli.command, &config).await
}
