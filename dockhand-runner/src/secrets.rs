//! Secret resolution
//!
//! Secrets are looked up by name when a step needs them. Empty values count
//! as missing.

use dockhand_core::domain::secret::Secret;
use std::collections::HashMap;

/// Source of named secrets
pub trait SecretStore: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Secret>;
}

/// Reads secrets from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve(&self, name: &str) -> Option<Secret> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .map(Secret::new)
    }
}

/// Fixed set of secrets, for embedding and tests
#[derive(Default, Clone)]
pub struct StaticSecretStore {
    values: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn resolve(&self, name: &str) -> Option<Secret> {
        self.values
            .get(name)
            .filter(|value| !value.is_empty())
            .map(|value| Secret::new(value.clone()))
    }
}
