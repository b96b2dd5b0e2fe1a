//! Workflow definition types
//!
//! A workflow is a named, ordered list of steps plus the trigger filter that
//! decides whether an event starts a run. Each step is backed by one of four
//! actions; their relative order is fixed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::image::ImageTag;
use crate::domain::trigger::TriggerFilter;
use crate::error::DefinitionError;

/// Well-known step input names
pub mod inputs {
    pub const REPOSITORY: &str = "repository";
    pub const REF: &str = "ref";
    pub const REGISTRY: &str = "registry";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const DRIVER: &str = "driver";
    pub const PLATFORMS: &str = "platforms";
    pub const CONTEXT: &str = "context";
    pub const FILE: &str = "file";
    pub const TAGS: &str = "tags";
    pub const PUSH: &str = "push";
}

/// Default secret names for registry credentials
pub const DEFAULT_USERNAME_SECRET: &str = "REGISTRY_USERNAME";
pub const DEFAULT_TOKEN_SECRET: &str = "REGISTRY_TOKEN";

/// The action backing a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionRef {
    Checkout,
    RegistryLogin,
    SetupBuilder,
    BuildPush,
}

impl ActionRef {
    pub const ALL: [ActionRef; 4] = [
        ActionRef::Checkout,
        ActionRef::RegistryLogin,
        ActionRef::SetupBuilder,
        ActionRef::BuildPush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionRef::Checkout => "checkout",
            ActionRef::RegistryLogin => "registry-login",
            ActionRef::SetupBuilder => "setup-builder",
            ActionRef::BuildPush => "build-push",
        }
    }
}

impl std::fmt::Display for ActionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionRef {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionRef::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| DefinitionError::UnknownAction(s.to_string()))
    }
}

/// A step input: either a literal or a reference to a named secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputValue {
    Literal(String),
    Secret(String),
}

/// A declared step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub action: ActionRef,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputValue>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, action: ActionRef) -> Self {
        Self {
            name: name.into(),
            action,
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_literal(mut self, key: &str, value: impl Into<String>) -> Self {
        self.inputs
            .insert(key.to_string(), InputValue::Literal(value.into()));
        self
    }

    pub fn with_secret(mut self, key: &str, secret_name: impl Into<String>) -> Self {
        self.inputs
            .insert(key.to_string(), InputValue::Secret(secret_name.into()));
        self
    }

    /// Returns a literal input, or None if absent or a secret
    pub fn literal(&self, key: &str) -> Option<&str> {
        match self.inputs.get(key) {
            Some(InputValue::Literal(value)) => Some(value),
            _ => None,
        }
    }
}

/// A complete workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub description: Option<String>,
    pub triggers: TriggerFilter,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// The canonical four-step publish workflow for `tag`
    pub fn standard(name: impl Into<String>, tag: &ImageTag) -> Self {
        Self {
            name: name.into(),
            description: None,
            triggers: TriggerFilter::main_or_manual(),
            steps: vec![
                StepDefinition::new("Checkout", ActionRef::Checkout),
                StepDefinition::new("Log in to registry", ActionRef::RegistryLogin)
                    .with_secret(inputs::USERNAME, DEFAULT_USERNAME_SECRET)
                    .with_secret(inputs::PASSWORD, DEFAULT_TOKEN_SECRET),
                StepDefinition::new("Set up builder", ActionRef::SetupBuilder),
                StepDefinition::new("Build and push", ActionRef::BuildPush)
                    .with_literal(inputs::CONTEXT, ".")
                    .with_literal(inputs::FILE, "Dockerfile")
                    .with_literal(inputs::PUSH, "true")
                    .with_literal(inputs::TAGS, tag.to_string()),
            ],
        }
    }

    /// Validates structure, step order and the image tag
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.triggers.is_empty() {
            return Err(DefinitionError::NoTriggers);
        }
        if let Some(branch) = self.triggers.invalid_branch() {
            return Err(DefinitionError::InvalidBranch(branch.to_string()));
        }
        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps);
        }

        let mut names = HashSet::new();
        let mut previous: Option<ActionRef> = None;
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(DefinitionError::DuplicateStepName(step.name.clone()));
            }

            if let Some(prev) = previous {
                if prev == step.action {
                    return Err(DefinitionError::DuplicateAction(step.action));
                }
                if prev > step.action {
                    return Err(DefinitionError::OutOfOrder {
                        step: step.name.clone(),
                        action: step.action,
                        after: prev,
                    });
                }
            }
            previous = Some(step.action);

            for (key, value) in &step.inputs {
                if matches!(value, InputValue::Secret(_)) && step.action != ActionRef::RegistryLogin
                {
                    return Err(DefinitionError::SecretNotAllowed {
                        step: step.name.clone(),
                        input: key.clone(),
                    });
                }
            }

            if step.action == ActionRef::RegistryLogin {
                for key in [inputs::USERNAME, inputs::PASSWORD] {
                    if !step.inputs.contains_key(key) {
                        return Err(DefinitionError::MissingInput {
                            step: step.name.clone(),
                            input: key.to_string(),
                        });
                    }
                }
            }
        }

        if previous != Some(ActionRef::BuildPush) {
            return Err(DefinitionError::MissingBuildPush);
        }

        self.image_tag().map(|_| ())
    }

    /// The fixed tag declared on the build-push step
    pub fn image_tag(&self) -> Result<ImageTag, DefinitionError> {
        let step = self
            .step_for(ActionRef::BuildPush)
            .ok_or(DefinitionError::MissingBuildPush)?;

        match step.inputs.get(inputs::TAGS) {
            Some(InputValue::Literal(raw)) => ImageTag::parse(raw),
            Some(InputValue::Secret(_)) => Err(DefinitionError::SecretNotAllowed {
                step: step.name.clone(),
                input: inputs::TAGS.to_string(),
            }),
            None => Err(DefinitionError::MissingInput {
                step: step.name.clone(),
                input: inputs::TAGS.to_string(),
            }),
        }
    }

    /// Whether the build-push step uploads its result
    pub fn pushes(&self) -> bool {
        self.step_for(ActionRef::BuildPush)
            .map(|step| step.literal(inputs::PUSH).map(parse_flag).unwrap_or(true))
            .unwrap_or(false)
    }

    pub fn step_for(&self, action: ActionRef) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.action == action)
    }
}

/// Parses a boolean input; anything other than a false-like value is true
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
