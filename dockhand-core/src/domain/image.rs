//! Image tag domain type
//!
//! The image reference a workflow publishes to. It is a literal from the
//! workflow definition and is never derived from the commit, branch or run.

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

const DEFAULT_TAG: &str = "latest";
const MAX_TAG_LEN: usize = 128;

/// Image reference of the form `[registry/]repository[:tag]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageTag {
    registry: Option<String>,
    repository: String,
    tag: String,
}

impl ImageTag {
    /// Parses and validates an image reference
    ///
    /// A missing tag defaults to `latest`. Template markers are rejected so
    /// that the reference cannot be expanded per run.
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let invalid = |reason: &str| DefinitionError::InvalidImageTag {
            tag: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.contains("${") || raw.contains("{{") {
            return Err(invalid("template expressions are not allowed"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }
        if raw.contains('@') {
            return Err(invalid("digests are not supported"));
        }

        // The tag separator is the last ':' after the last '/'
        let last_slash = raw.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match raw[last_slash..].rfind(':') {
            Some(i) => (&raw[..last_slash + i], &raw[last_slash + i + 1..]),
            None => (raw, DEFAULT_TAG),
        };

        if !is_valid_tag(tag) {
            return Err(invalid("tag must be 1-128 of [A-Za-z0-9_.-] and not start with '.' or '-'"));
        }

        let mut components: Vec<&str> = name.split('/').collect();
        let registry = if components.len() > 1 && looks_like_registry(components[0]) {
            Some(components.remove(0).to_string())
        } else {
            None
        };

        if components.iter().any(|c| !is_valid_path_component(c)) {
            return Err(invalid(
                "repository components must be lowercase [a-z0-9._-] and not empty",
            ));
        }

        Ok(Self {
            registry,
            repository: components.join("/"),
            tag: tag.to_string(),
        })
    }

    /// Registry host, or None for the default registry
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl std::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl std::str::FromStr for ImageTag {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageTag {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageTag> for String {
    fn from(tag: ImageTag) -> Self {
        tag.to_string()
    }
}

fn looks_like_registry(component: &str) -> bool {
    component == "localhost" || component.contains('.') || component.contains(':')
}

fn is_valid_path_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        && !component.starts_with(['.', '_', '-'])
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= MAX_TAG_LEN
        && !tag.starts_with(['.', '-'])
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
