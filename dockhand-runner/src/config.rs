//! Runner configuration
//!
//! Defines where workspaces live, which repository is checked out by default
//! and which external binaries back the actions.

use anyhow::Context;
use dockhand_core::domain::workflow::parse_flag;
use std::path::PathBuf;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which per-run workspaces are created
    pub workspace_base: PathBuf,

    /// Repository checked out when a step does not name one (URL or path)
    pub repository: String,

    /// git executable
    pub git_bin: String,

    /// docker executable (with the buildx plugin)
    pub docker_bin: String,

    /// buildx driver for provisioned builders
    pub builder_driver: String,

    /// Keep the workspace after the run, for debugging
    pub keep_workspace: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(workspace_base: PathBuf, repository: String) -> Self {
        Self {
            workspace_base,
            repository,
            git_bin: "git".to_string(),
            docker_bin: "docker".to_string(),
            builder_driver: "docker-container".to_string(),
            keep_workspace: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - DOCKHAND_WORKSPACE_BASE (default: system temp dir)
    /// - DOCKHAND_REPOSITORY (default: ".")
    /// - DOCKHAND_GIT_BIN (default: "git")
    /// - DOCKHAND_DOCKER_BIN (default: "docker")
    /// - DOCKHAND_BUILDER_DRIVER (default: "docker-container")
    /// - DOCKHAND_KEEP_WORKSPACE (default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let workspace_base = var("DOCKHAND_WORKSPACE_BASE")
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace_base);

        let config = Self {
            workspace_base,
            repository: var("DOCKHAND_REPOSITORY").unwrap_or(defaults.repository),
            git_bin: var("DOCKHAND_GIT_BIN").unwrap_or(defaults.git_bin),
            docker_bin: var("DOCKHAND_DOCKER_BIN").unwrap_or(defaults.docker_bin),
            builder_driver: var("DOCKHAND_BUILDER_DRIVER").unwrap_or(defaults.builder_driver),
            keep_workspace: var("DOCKHAND_KEEP_WORKSPACE")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        };

        config
            .validate()
            .context("Invalid configuration from environment")?;

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        if self.repository.trim().is_empty() {
            anyhow::bail!("repository cannot be empty");
        }

        if self.git_bin.trim().is_empty() || self.docker_bin.trim().is_empty() {
            anyhow::bail!("git_bin and docker_bin cannot be empty");
        }

        if self.builder_driver.trim().is_empty() {
            anyhow::bail!("builder_driver cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("dockhand"), ".".to_string())
    }
}
