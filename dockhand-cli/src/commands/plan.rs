//! Plan command handler
//!
//! Shows whether an event triggers the workflow and which steps would run,
//! without executing anything.

use anyhow::Result;
use colored::*;

use super::EventArgs;
use crate::config::Config;
use crate::output::print_workflow;

pub fn handle_plan_command(args: EventArgs, config: &Config) -> Result<()> {
    let workflow = config.load_workflow()?;
    let event = args.to_event()?;

    if workflow.triggers.matches(&event) {
        println!(
            "{} {}",
            "✓".green(),
            format!("Event {} triggers workflow '{}'", event, workflow.name).bold()
        );
    } else {
        println!(
            "{} {}",
            "✗".yellow(),
            format!(
                "Event {} does not trigger workflow '{}'",
                event, workflow.name
            )
            .bold()
        );
        return Ok(());
    }

    println!();
    print_workflow(&workflow)
}
