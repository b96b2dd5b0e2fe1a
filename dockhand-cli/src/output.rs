//! Terminal output helpers

use anyhow::Result;
use colored::*;
use dockhand_core::domain::log::LogLevel;
use dockhand_core::domain::run::{RunReport, RunStatus, StepStatus};
use dockhand_core::domain::workflow::{InputValue, WorkflowDefinition};

/// Print a workflow summary: triggers, tag and ordered steps
pub fn print_workflow(workflow: &WorkflowDefinition) -> Result<()> {
    let tag = workflow.image_tag()?;

    println!("  {} Workflow {}", "▸".cyan(), workflow.name.bold());
    if let Some(description) = &workflow.description {
        println!("    {}", description.dimmed());
    }

    let mut triggers = workflow
        .triggers
        .push_branches
        .iter()
        .map(|b| format!("push to {}", b))
        .collect::<Vec<_>>();
    if workflow.triggers.manual {
        triggers.push("manual dispatch".to_string());
    }
    println!("    Triggers:     {}", triggers.join(", "));
    println!(
        "    Image:        {}{}",
        tag.to_string().bold(),
        if workflow.pushes() { "" } else { " (not pushed)" }
    );
    println!("    Steps:");

    for (idx, step) in workflow.steps.iter().enumerate() {
        println!(
            "      {}. {} {}",
            idx + 1,
            step.name,
            format!("[{}]", step.action).dimmed()
        );
        for (key, value) in &step.inputs {
            let shown = match value {
                InputValue::Literal(v) => v.clone(),
                InputValue::Secret(name) => format!("secret({})", name),
            };
            println!("           {} = {}", key.dimmed(), shown);
        }
    }

    Ok(())
}

/// Print a run report
pub fn print_report(report: &RunReport) {
    println!();
    println!(
        "  {} Run {} of {}",
        "▸".cyan(),
        report.run_id.to_string().bold(),
        report.workflow.bold()
    );
    println!("    Trigger:      {}", report.trigger);
    println!("    Status:       {}", colorize_run_status(report.status));

    for step in &report.steps {
        println!(
            "      {} {} {}",
            step_marker(step.status),
            step.name,
            format!("[{}]", step.action).dimmed()
        );
    }

    if let Some(tag) = &report.published {
        println!("    Published:    {}", tag.to_string().green());
    }

    if let Some(failure) = &report.failure {
        println!(
            "    Failure:      {} in '{}': {}",
            failure.kind.to_string().red(),
            failure.step,
            failure.message
        );

        let errors: Vec<_> = report
            .logs
            .iter()
            .filter(|e| matches!(e.level, LogLevel::Warning | LogLevel::Error))
            .collect();
        if !errors.is_empty() {
            println!("    Log:");
            for entry in errors {
                println!(
                    "      {} {} {}",
                    entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
                    entry.level,
                    entry.message
                );
            }
        }
    }
    println!();
}

fn colorize_run_status(status: RunStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        RunStatus::Succeeded => status_str.green(),
        RunStatus::Failed => status_str.red(),
        RunStatus::Pending | RunStatus::Running => status_str.yellow(),
    }
}

fn step_marker(status: StepStatus) -> ColoredString {
    match status {
        StepStatus::Succeeded => "✓".green(),
        StepStatus::Failed => "✗".red(),
        StepStatus::Running => "…".yellow(),
        StepStatus::Pending => "·".dimmed(),
    }
}
