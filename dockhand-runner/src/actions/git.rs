//! Git checkout
//!
//! Shallow-clones the repository into the workspace source dir. A push event
//! carrying a commit id is pinned to that commit.

use async_trait::async_trait;
use dockhand_core::error::StepError;
use std::path::Path;
use tokio::process::Command;

use super::{CheckoutRequest, SourceCheckout};
use crate::context::StepContext;
use crate::process::{self, CommandOutput};

pub struct GitCheckout {
    git_bin: String,
}

impl GitCheckout {
    pub fn new(git_bin: String) -> Self {
        Self { git_bin }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.git_bin);
        command.env("GIT_TERMINAL_PROMPT", "0");
        command
    }

    async fn run_git(
        &self,
        ctx: &StepContext<'_>,
        args: &[String],
        what: &str,
    ) -> Result<CommandOutput, StepError> {
        let mut command = self.command();
        command.args(args);

        let output = process::run(ctx, &mut command, None)
            .await
            .map_err(|e| StepError::Checkout(format!("failed to run {}: {}", self.git_bin, e)))?;

        if !output.success() {
            return Err(StepError::Checkout(format!(
                "{}: {}",
                what,
                ctx.redact(&output.diagnostic())
            )));
        }
        Ok(output)
    }
}

/// Strips `refs/heads/` or `refs/tags/` so the ref can be passed to `--branch`
pub fn short_ref(git_ref: &str) -> &str {
    git_ref
        .strip_prefix("refs/heads/")
        .or_else(|| git_ref.strip_prefix("refs/tags/"))
        .unwrap_or(git_ref)
}

/// Arguments for the initial shallow clone
pub fn clone_args(request: &CheckoutRequest, dest: &Path) -> Vec<String> {
    let mut args = vec!["clone".to_string(), "--depth".to_string(), "1".to_string()];
    if let Some(git_ref) = &request.git_ref {
        args.push("--branch".to_string());
        args.push(short_ref(git_ref).to_string());
    }
    args.push("--".to_string());
    args.push(request.repository.clone());
    args.push(dest.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl SourceCheckout for GitCheckout {
    async fn checkout(
        &self,
        ctx: &StepContext<'_>,
        request: &CheckoutRequest,
    ) -> Result<(), StepError> {
        let dest = ctx.workspace.source_dir();
        ctx.log_info(format!(
            "Checking out {} ({}) into {}",
            request.repository,
            request.git_ref.as_deref().unwrap_or("default branch"),
            dest.display()
        ));

        self.run_git(ctx, &clone_args(request, &dest), "clone failed")
            .await?;

        if let Some(commit) = &request.commit {
            let dir = dest.to_string_lossy().into_owned();
            let fetch = [
                "-C".to_string(),
                dir.clone(),
                "fetch".to_string(),
                "--depth".to_string(),
                "1".to_string(),
                "origin".to_string(),
                commit.clone(),
            ];
            self.run_git(ctx, &fetch, "fetch of pushed commit failed")
                .await?;

            let detach = [
                "-C".to_string(),
                dir,
                "checkout".to_string(),
                "--detach".to_string(),
                "FETCH_HEAD".to_string(),
            ];
            self.run_git(ctx, &detach, "checkout of pushed commit failed")
                .await?;
        }

        ctx.log_info("Checkout complete");
        Ok(())
    }
}
