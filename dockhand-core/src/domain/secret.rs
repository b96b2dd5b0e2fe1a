//! Secret values
//!
//! Secrets are resolved by name at execution time and only ever exposed
//! through [`Secret::expose`]. Formatting a secret prints a mask.

const MASK: &str = "***";

/// An opaque secret string
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value, for handing to an external process
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({})", MASK)
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(MASK)
    }
}

/// Registry credentials for a single run
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: Secret,
    pub token: Secret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_masked() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{}", secret), "***");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_credentials_debug_is_masked() {
        let credentials = Credentials {
            username: Secret::new("robot"),
            token: Secret::new("dckr_pat_123"),
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("robot"));
        assert!(!debug.contains("dckr_pat_123"));
    }
}
