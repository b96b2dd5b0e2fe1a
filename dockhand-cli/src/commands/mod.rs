//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod event;
mod init;
mod plan;
mod run;
mod validate;

pub use event::EventArgs;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::{Config, WORKFLOW_FILE};

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the workflow for a trigger event
    Run {
        #[command(flatten)]
        event: EventArgs,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether an event would trigger the workflow, and its steps
    Plan {
        #[command(flatten)]
        event: EventArgs,
    },
    /// Parse and validate the workflow
    Validate,
    /// Write the default workflow file
    Init {
        /// Output path
        #[arg(short, long, default_value = WORKFLOW_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { event, json } => run::handle_run_command(event, json, config).await,
        Commands::Plan { event } => plan::handle_plan_command(event, config),
        Commands::Validate => validate::handle_validate_command(config),
        Commands::Init { output, force } => init::handle_init_command(&output, force, config),
    }
}
