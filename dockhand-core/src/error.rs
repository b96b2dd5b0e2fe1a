//! Error types for Dockhand
//!
//! Two families:
//! - [`StepError`]: a step failed during a run. Never retried; it ends the run.
//! - [`DefinitionError`]: a workflow definition is invalid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::workflow::ActionRef;

/// Failure raised by a step
#[derive(Debug, Error)]
pub enum StepError {
    /// Repository contents could not be materialised
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// Registry credentials are missing or were rejected
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The build backend could not be provisioned
    #[error("environment setup failed: {0}")]
    Environment(String),

    /// The build descriptor is invalid or the build failed
    #[error("build failed: {0}")]
    Build(String),

    /// The registry rejected the upload
    #[error("push failed: {0}")]
    Push(String),
}

impl StepError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StepError::Checkout(_) => FailureKind::Checkout,
            StepError::Authentication(_) => FailureKind::Authentication,
            StepError::Environment(_) => FailureKind::Environment,
            StepError::Build(_) => FailureKind::Build,
            StepError::Push(_) => FailureKind::Push,
        }
    }
}

/// Serializable classification of a [`StepError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Checkout,
    Authentication,
    Environment,
    Build,
    Push,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Checkout => write!(f, "CheckoutError"),
            FailureKind::Authentication => write!(f, "AuthenticationError"),
            FailureKind::Environment => write!(f, "EnvironmentError"),
            FailureKind::Build => write!(f, "BuildError"),
            FailureKind::Push => write!(f, "PushError"),
        }
    }
}

/// Workflow definition validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("workflow name must not be empty")]
    EmptyName,

    #[error("workflow must have at least one step")]
    NoSteps,

    #[error("workflow declares no triggers")]
    NoTriggers,

    #[error("push trigger '{0}' is not a branch")]
    InvalidBranch(String),

    #[error("duplicate step name '{0}'")]
    DuplicateStepName(String),

    #[error("action '{0}' is used more than once")]
    DuplicateAction(ActionRef),

    #[error("step '{step}' ({action}) must come before '{after}'")]
    OutOfOrder {
        step: String,
        action: ActionRef,
        after: ActionRef,
    },

    #[error("workflow must end with a '{}' step", ActionRef::BuildPush)]
    MissingBuildPush,

    #[error("step '{step}' is missing required input '{input}'")]
    MissingInput { step: String, input: String },

    #[error("input '{input}' of step '{step}' must be a literal value")]
    SecretNotAllowed { step: String, input: String },

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid image tag '{tag}': {reason}")]
    InvalidImageTag { tag: String, reason: String },
}
