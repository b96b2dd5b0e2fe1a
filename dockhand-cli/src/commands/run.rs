//! Run command handler
//!
//! Dispatches the workflow for the given event and reports the outcome.
//! A failed run makes the process exit non-zero.

use anyhow::{Context, Result};
use colored::*;
use dockhand_core::domain::trigger::TriggerEvent;
use dockhand_core::domain::workflow::WorkflowDefinition;
use dockhand_runner::{Actions, EnvSecretStore, ExecutionService, PipelineRunner};
use std::sync::Arc;
use tracing::info;

use super::EventArgs;
use crate::config::Config;
use crate::output::print_report;

pub async fn handle_run_command(args: EventArgs, json: bool, config: &Config) -> Result<()> {
    let workflow = config.load_workflow()?;
    let event = args.to_event()?;

    let runner_config =
        dockhand_runner::Config::from_env().context("Failed to load runner configuration")?;
    info!(
        "Runner configuration: workspace_base={}, repository={}",
        runner_config.workspace_base.display(),
        runner_config.repository
    );

    let actions = Actions::standard(&runner_config);
    let runner = PipelineRunner::new(runner_config, actions, Arc::new(EnvSecretStore));

    run_workflow(&runner, &workflow, event, json).await
}

/// Dispatches `event` and prints the outcome
///
/// Returns an error only when a triggered run fails; an event that does not
/// trigger the workflow is not a failure.
pub async fn run_workflow(
    runner: &dyn ExecutionService,
    workflow: &WorkflowDefinition,
    event: TriggerEvent,
    json: bool,
) -> Result<()> {
    let Some(report) = runner.dispatch(workflow, event.clone()).await? else {
        if json {
            println!("{}", serde_json::json!({ "triggered": false, "event": event }));
        } else {
            println!(
                "{}",
                format!(
                    "Event {} does not trigger workflow '{}'; nothing to do.",
                    event, workflow.name
                )
                .yellow()
            );
        }
        return Ok(());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
    } else {
        print_report(&report);
    }

    if report.succeeded() {
        return Ok(());
    }

    match &report.failure {
        Some(failure) => Err(anyhow::anyhow!(
            "run {} failed at step '{}' ({})",
            report.run_id,
            failure.step,
            failure.kind
        )),
        None => Err(anyhow::anyhow!(
            "run {} ended with status {}",
            report.run_id,
            report.status
        )),
    }
}
