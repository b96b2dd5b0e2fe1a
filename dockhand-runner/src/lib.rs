//! Dockhand Runner
//!
//! Executes a workflow's steps for one trigger event inside a freshly
//! provisioned workspace, stopping at the first failing step.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Workspace: the per-run ephemeral execution environment
//! - Secrets: named secret resolution from the process environment
//! - Actions: checkout, registry login, builder setup and build/push, each
//!   behind a trait with git/docker implementations
//! - Services: run execution and log buffering

pub mod actions;
pub mod config;
pub mod context;
pub mod process;
pub mod secrets;
pub mod service;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use actions::Actions;
pub use config::Config;
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore};
pub use service::{ExecutionService, InMemoryLogBuffer, LogBufferService, PipelineRunner};
