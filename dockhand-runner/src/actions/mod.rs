//! Step actions
//!
//! Each external collaborator sits behind a narrow trait so the run sequence
//! stays the same whatever implements it:
//! - [`SourceCheckout`]: version control (git)
//! - [`RegistryClient`]: registry authentication (docker login)
//! - [`BuilderBackend`]: multi-platform build backend (docker buildx)
//! - [`ImageBuilder`]: build and push (docker buildx build)

mod docker;
mod git;

pub use docker::{BuildxBackend, BuildxImageBuilder, DockerRegistryClient, classify_build_failure};
pub use git::GitCheckout;

use async_trait::async_trait;
use dockhand_core::domain::image::ImageTag;
use dockhand_core::domain::secret::Credentials;
use dockhand_core::error::StepError;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::context::StepContext;

/// What to check out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Repository URL or local path
    pub repository: String,
    /// Branch or tag; None for the remote default
    pub git_ref: Option<String>,
    /// Exact commit to detach onto
    pub commit: Option<String>,
}

/// Registry login parameters
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Registry host; None for the default registry
    pub registry: Option<String>,
    pub credentials: Credentials,
}

/// Builder provisioning parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderRequest {
    pub name: String,
    pub driver: String,
    pub platforms: Vec<String>,
}

/// A provisioned builder, torn down at the end of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderHandle {
    pub name: String,
}

/// Build (and optionally push) parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Build context directory
    pub context: PathBuf,
    /// Build descriptor (Dockerfile)
    pub descriptor: PathBuf,
    pub tag: ImageTag,
    pub platforms: Vec<String>,
    pub push: bool,
    /// Builder to use; None for the client default
    pub builder: Option<String>,
}

/// Materialises repository contents into the workspace
#[async_trait]
pub trait SourceCheckout: Send + Sync {
    async fn checkout(&self, ctx: &StepContext<'_>, request: &CheckoutRequest)
    -> Result<(), StepError>;
}

/// Opens an authenticated registry session for the run
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn login(&self, ctx: &StepContext<'_>, request: &LoginRequest) -> Result<(), StepError>;
}

/// Provisions the build backend
#[async_trait]
pub trait BuilderBackend: Send + Sync {
    async fn provision(
        &self,
        ctx: &StepContext<'_>,
        request: &BuilderRequest,
    ) -> Result<BuilderHandle, StepError>;

    /// Removes a provisioned builder; failures are logged, not fatal
    async fn teardown(&self, ctx: &StepContext<'_>, handle: &BuilderHandle) -> anyhow::Result<()>;
}

/// Builds the image and uploads it under its tag
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, ctx: &StepContext<'_>, request: &BuildRequest) -> Result<(), StepError>;
}

/// The set of action implementations a runner dispatches to
#[derive(Clone)]
pub struct Actions {
    pub checkout: Arc<dyn SourceCheckout>,
    pub registry: Arc<dyn RegistryClient>,
    pub builder: Arc<dyn BuilderBackend>,
    pub image: Arc<dyn ImageBuilder>,
}

impl Actions {
    /// git + docker buildx implementations
    pub fn standard(config: &Config) -> Self {
        Self {
            checkout: Arc::new(GitCheckout::new(config.git_bin.clone())),
            registry: Arc::new(DockerRegistryClient::new(config.docker_bin.clone())),
            builder: Arc::new(BuildxBackend::new(config.docker_bin.clone())),
            image: Arc::new(BuildxImageBuilder::new(config.docker_bin.clone())),
        }
    }
}
