//! Per-run workspace
//!
//! Every run gets a fresh directory under the configured base:
//! - `src/`: checkout target and build context root
//! - `docker/`: docker client config, so the registry session is scoped to
//!   the run
//!
//! The directory is removed when the workspace is dropped, which discards the
//! checked-out files and the authenticated session together.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Workspace {
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Creates `<base>/<run_id>` with its subdirectories
    ///
    /// Fails if the directory already exists, so a run never inherits state.
    pub fn provision(base: &Path, run_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(base)
            .with_context(|| format!("Failed to create workspace base {}", base.display()))?;

        let root = base.join(run_id.to_string());
        std::fs::create_dir(&root)
            .with_context(|| format!("Failed to create workspace {}", root.display()))?;

        let workspace = Self { root, keep: false };
        for dir in [workspace.source_dir(), workspace.docker_config_dir()] {
            std::fs::create_dir(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        info!("Provisioned workspace {}", workspace.root.display());
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checkout target
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Value for DOCKER_CONFIG during the run
    pub fn docker_config_dir(&self) -> PathBuf {
        self.root.join("docker")
    }

    /// Resolves a path relative to the checkout
    ///
    /// Absolute paths and paths that climb out of the checkout are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, String> {
        let path = Path::new(relative);
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(format!("path '{}' must stay inside the checkout", relative)),
            }
        }
        Ok(self.source_dir().join(path))
    }

    /// Keep the directory after the run
    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }

    /// Removes the workspace directory
    pub fn cleanup(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .with_context(|| format!("Failed to remove workspace {}", self.root.display()))?;
            debug!("Removed workspace {}", self.root.display());
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            info!("Keeping workspace {}", self.root.display());
            return;
        }
        if let Err(e) = self.cleanup() {
            warn!("Failed to cleanup workspace on drop: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        std::env::temp_dir().join(format!("dockhand-ws-test-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_provision_and_drop() {
        let base = base();
        let root;
        {
            let workspace = Workspace::provision(&base, Uuid::new_v4()).unwrap();
            root = workspace.root().to_path_buf();
            assert!(workspace.source_dir().is_dir());
            assert!(workspace.docker_config_dir().is_dir());
        }
        assert!(!root.exists());
        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn test_provision_refuses_existing_dir() {
        let base = base();
        let run_id = Uuid::new_v4();
        let _first = Workspace::provision(&base, run_id).unwrap();
        assert!(Workspace::provision(&base, run_id).is_err());
        drop(_first);
        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn test_keep_workspace() {
        let base = base();
        let mut workspace = Workspace::provision(&base, Uuid::new_v4()).unwrap();
        workspace.set_keep(true);
        let root = workspace.root().to_path_buf();
        drop(workspace);
        assert!(root.exists());
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_resolve() {
        let base = base();
        let workspace = Workspace::provision(&base, Uuid::new_v4()).unwrap();

        assert_eq!(
            workspace.resolve("docker/Dockerfile").unwrap(),
            workspace.source_dir().join("docker/Dockerfile")
        );
        assert_eq!(workspace.resolve(".").unwrap(), workspace.source_dir().join("."));
        assert!(workspace.resolve("../etc/passwd").is_err());
        assert!(workspace.resolve("/etc/passwd").is_err());

        drop(workspace);
        let _ = std::fs::remove_dir_all(&base);
    }
}
