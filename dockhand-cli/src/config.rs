//! Configuration module
//!
//! Handles CLI configuration and workflow resolution.

use anyhow::{Context, Result};
use dockhand_core::domain::image::ImageTag;
use dockhand_core::domain::workflow::WorkflowDefinition;
use dockhand_lua::{default_workflow, load_workflow_file};
use std::path::{Path, PathBuf};
use tracing::info;

/// Workflow file picked up from the working directory
pub const WORKFLOW_FILE: &str = "dockhand.lua";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit workflow file
    pub workflow: Option<PathBuf>,
    /// Tag for the built-in workflow
    pub tag: String,
}

impl Config {
    /// Loads the workflow to operate on
    ///
    /// Order: `--workflow`, then `./dockhand.lua`, then the built-in workflow
    /// with `--tag`.
    pub fn load_workflow(&self) -> Result<WorkflowDefinition> {
        if let Some(path) = &self.workflow {
            return load_workflow_file(path);
        }

        let local = Path::new(WORKFLOW_FILE);
        if local.is_file() {
            info!("Using workflow file {}", WORKFLOW_FILE);
            return load_workflow_file(local);
        }

        info!("No workflow file found, using the built-in workflow");
        default_workflow(&self.image_tag()?)
    }

    pub fn image_tag(&self) -> Result<ImageTag> {
        ImageTag::parse(&self.tag).with_context(|| format!("Invalid --tag '{}'", self.tag))
    }
}
