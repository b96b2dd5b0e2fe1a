//! Execution service
//!
//! Handles a workflow run end to end:
//! - Ignoring events the workflow's triggers do not match
//! - Provisioning the run workspace
//! - Executing steps one by one, stopping at the first failure
//! - Tearing down the builder and the workspace afterwards
//!
//! This service contains the core business logic of the runner.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dockhand_core::domain::image::ImageTag;
use dockhand_core::domain::run::{RunReport, RunStatus};
use dockhand_core::domain::secret::{Credentials, Secret};
use dockhand_core::domain::trigger::TriggerEvent;
use dockhand_core::domain::workflow::{
    ActionRef, InputValue, StepDefinition, WorkflowDefinition, inputs, parse_flag,
};
use dockhand_core::error::StepError;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::actions::{
    Actions, BuildRequest, BuilderHandle, BuilderRequest, CheckoutRequest, LoginRequest,
};
use crate::config::Config;
use crate::context::StepContext;
use crate::secrets::SecretStore;
use crate::service::log_buffer::{InMemoryLogBuffer, LogBufferService};
use crate::workspace::Workspace;

/// Service trait for executing workflow runs
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Runs the workflow if the event matches its triggers
    ///
    /// Returns `None` without provisioning anything when the event does not
    /// match.
    async fn dispatch(
        &self,
        workflow: &WorkflowDefinition,
        event: TriggerEvent,
    ) -> Result<Option<RunReport>>;

    /// Runs the workflow unconditionally
    ///
    /// Step failures are reported in the returned report. `Err` means the run
    /// could not be carried out at all (e.g. the workspace could not be
    /// created).
    async fn execute(&self, workflow: &WorkflowDefinition, event: TriggerEvent)
    -> Result<RunReport>;
}

/// Mutable state carried between the steps of one run
#[derive(Default)]
struct RunState {
    builder: Option<BuilderHandle>,
    published: Option<ImageTag>,
}

/// Sequential, fail-fast workflow runner
pub struct PipelineRunner {
    config: Config,
    actions: Actions,
    secrets: Arc<dyn SecretStore>,
}

impl PipelineRunner {
    pub fn new(config: Config, actions: Actions, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            config,
            actions,
            secrets,
        }
    }

    /// Executes a single step
    async fn execute_step(
        &self,
        ctx: &StepContext<'_>,
        workflow: &WorkflowDefinition,
        step: &StepDefinition,
        state: &mut RunState,
    ) -> Result<(), StepError> {
        match step.action {
            ActionRef::Checkout => {
                let request = self.checkout_request(ctx.event, step);
                self.actions.checkout.checkout(ctx, &request).await
            }
            ActionRef::RegistryLogin => {
                let credentials = Credentials {
                    username: self.resolve_credential(step, inputs::USERNAME)?,
                    token: self.resolve_credential(step, inputs::PASSWORD)?,
                };
                ctx.mask(&credentials.username);
                ctx.mask(&credentials.token);

                let request = LoginRequest {
                    registry: step.literal(inputs::REGISTRY).map(str::to_string),
                    credentials,
                };
                self.actions.registry.login(ctx, &request).await
            }
            ActionRef::SetupBuilder => {
                let request = BuilderRequest {
                    name: format!("dockhand-{}", ctx.run_id.simple()),
                    driver: step
                        .literal(inputs::DRIVER)
                        .unwrap_or(self.config.builder_driver.as_str())
                        .to_string(),
                    platforms: split_list(step.literal(inputs::PLATFORMS)),
                };
                let handle = self.actions.builder.provision(ctx, &request).await?;
                state.builder = Some(handle);
                Ok(())
            }
            ActionRef::BuildPush => {
                let request = self.build_request(ctx, workflow, step, state)?;
                self.actions.image.build(ctx, &request).await?;
                if request.push {
                    state.published = Some(request.tag);
                }
                Ok(())
            }
        }
    }

    /// Repository from the step or config; ref from the step or the event
    ///
    /// The pushed commit is only pinned when the step does not override the ref.
    fn checkout_request(&self, event: &TriggerEvent, step: &StepDefinition) -> CheckoutRequest {
        let repository = step
            .literal(inputs::REPOSITORY)
            .unwrap_or(self.config.repository.as_str())
            .to_string();

        match step.literal(inputs::REF) {
            Some(git_ref) => CheckoutRequest {
                repository,
                git_ref: Some(git_ref.to_string()),
                commit: None,
            },
            None => CheckoutRequest {
                repository,
                git_ref: event.git_ref().map(str::to_string),
                commit: event.commit().map(str::to_string),
            },
        }
    }

    fn resolve_credential(&self, step: &StepDefinition, key: &str) -> Result<Secret, StepError> {
        match step.inputs.get(key) {
            Some(InputValue::Secret(name)) => self.secrets.resolve(name).ok_or_else(|| {
                StepError::Authentication(format!("secret '{}' is not set", name))
            }),
            Some(InputValue::Literal(value)) if !value.is_empty() => Ok(Secret::new(value.clone())),
            _ => Err(StepError::Authentication(format!(
                "input '{}' is missing",
                key
            ))),
        }
    }

    fn build_request(
        &self,
        ctx: &StepContext<'_>,
        workflow: &WorkflowDefinition,
        step: &StepDefinition,
        state: &RunState,
    ) -> Result<BuildRequest, StepError> {
        let tag = workflow
            .image_tag()
            .map_err(|e| StepError::Build(e.to_string()))?;

        let context = ctx
            .workspace
            .resolve(step.literal(inputs::CONTEXT).unwrap_or("."))
            .map_err(StepError::Build)?;

        let file = step.literal(inputs::FILE).unwrap_or("Dockerfile");
        let descriptor = ctx.workspace.resolve(file).map_err(StepError::Build)?;
        if !descriptor.is_file() {
            return Err(StepError::Build(format!(
                "build descriptor '{}' not found in checkout",
                file
            )));
        }

        // Platforms default to whatever the builder was set up for
        let platforms = match step.literal(inputs::PLATFORMS) {
            Some(list) => split_list(Some(list)),
            None => split_list(
                workflow
                    .step_for(ActionRef::SetupBuilder)
                    .and_then(|s| s.literal(inputs::PLATFORMS)),
            ),
        };

        Ok(BuildRequest {
            context,
            descriptor,
            tag,
            platforms,
            push: step.literal(inputs::PUSH).map(parse_flag).unwrap_or(true),
            builder: state.builder.as_ref().map(|b| b.name.clone()),
        })
    }
}

#[async_trait]
impl ExecutionService for PipelineRunner {
    async fn dispatch(
        &self,
        workflow: &WorkflowDefinition,
        event: TriggerEvent,
    ) -> Result<Option<RunReport>> {
        if !workflow.triggers.matches(&event) {
            info!(
                "Event {} does not match triggers of workflow '{}', skipping",
                event, workflow.name
            );
            return Ok(None);
        }

        self.execute(workflow, event).await.map(Some)
    }

    async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        event: TriggerEvent,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        info!(
            "Starting run {} of workflow '{}' for {}",
            run_id, workflow.name, event
        );

        let mut workspace = Workspace::provision(&self.config.workspace_base, run_id)
            .context("Failed to provision run workspace")?;
        workspace.set_keep(self.config.keep_workspace);

        let log_buffer: Arc<dyn LogBufferService> = Arc::new(InMemoryLogBuffer::new());
        let ctx = StepContext::new(run_id, &event, &workspace, log_buffer.clone());

        let mut report = RunReport::new(run_id, workflow, event.clone());
        let mut state = RunState::default();
        report.start();
        ctx.log_info(format!("Starting workflow: {}", workflow.name));

        let total = workflow.steps.len();
        for (idx, step) in workflow.steps.iter().enumerate() {
            info!("Executing step {}/{}: {}", idx + 1, total, step.name);
            ctx.log_info(format!("Starting step: {}", step.name));
            report.step_started(idx);

            match self.execute_step(&ctx, workflow, step, &mut state).await {
                Ok(()) => {
                    report.step_succeeded(idx);
                    ctx.log_info(format!("Step '{}' completed", step.name));
                }
                Err(e) => {
                    error!("Step '{}' failed: {}", step.name, ctx.redact(&e.to_string()));
                    ctx.log_error(format!("Step '{}' failed: {}", step.name, e));
                    report.step_failed(idx, &e);
                    break;
                }
            }
        }

        if report.status == RunStatus::Running {
            report.published = state.published.take();
            report.finish(RunStatus::Succeeded);
            ctx.log_info("Workflow completed successfully");
            info!("Run {} succeeded", run_id);
        } else {
            info!("Run {} failed", run_id);
        }

        if let Some(handle) = state.builder.take() {
            if let Err(e) = self.actions.builder.teardown(&ctx, &handle).await {
                warn!("Failed to tear down builder {}: {:#}", handle.name, e);
                ctx.log_warning(format!("Failed to tear down builder {}", handle.name));
            }
        }

        if let Some(failure) = report.failure.as_mut() {
            failure.message = ctx.redact(&failure.message);
        }
        report.logs = log_buffer.drain();
        drop(ctx);
        drop(workspace);

        Ok(report)
    }
}

/// Splits a comma-separated input into trimmed, non-empty items
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
