//! Validate command handler

use anyhow::Result;
use colored::*;

use crate::config::Config;
use crate::output::print_workflow;

pub fn handle_validate_command(config: &Config) -> Result<()> {
    let workflow = config.load_workflow()?;

    println!("{}", "✓ Workflow is valid".green().bold());
    println!();
    print_workflow(&workflow)
}
