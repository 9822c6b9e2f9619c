//! Secret references in configuration files.
//!
//! Config files never hold secrets directly: they name an environment
//! variable, and the value is looked up when the toolset is built. A custom
//! resolver can stand in for the environment (vaults, secret managers).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{RestkitError, RestkitResult};

/// A reference to an environment variable or secret key.
///
/// ```no_run
/// use restkit::config::EnvKey;
///
/// let token = EnvKey::new("PETSTORE_TOKEN").resolve().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvKey(String);

impl EnvKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    /// Resolve through `std::env`.
    pub fn resolve(&self) -> RestkitResult<String> {
        default_env_resolver(&self.0)
    }

    /// Resolve through `resolver`, or `std::env` when none is given.
    pub fn resolve_with(&self, resolver: Option<&EnvResolverFn>) -> RestkitResult<String> {
        match resolver {
            Some(resolver) => resolver(self.key()),
            None => self.resolve(),
        }
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EnvKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EnvKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Maps a key name to its secret value.
pub type EnvResolverFn = Arc<dyn Fn(&str) -> RestkitResult<String> + Send + Sync>;

pub fn default_env_resolver(key: &str) -> RestkitResult<String> {
    std::env::var(key).map_err(|_| RestkitError::InvalidConfiguration {
        field: key.to_string(),
        reason: format!("Environment variable '{key}' not found"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_from_str() {
        let key: EnvKey = "PETSTORE_TOKEN".into();
        assert_eq!(key.key(), "PETSTORE_TOKEN");
        assert_eq!(key.to_string(), "PETSTORE_TOKEN");
    }

    #[test]
    fn test_env_key_resolve() {
        unsafe {
            std::env::set_var("RESTKIT_TEST_KEY_1", "test_value");
        }
        let key = EnvKey::new("RESTKIT_TEST_KEY_1");
        assert_eq!(key.resolve().unwrap(), "test_value");
    }

    #[test]
    fn test_env_key_resolve_missing() {
        let err = EnvKey::new("RESTKIT_MISSING_KEY_XYZ").resolve().unwrap_err();
        assert!(matches!(err, RestkitError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_custom_resolver_wins() {
        let vault: EnvResolverFn = Arc::new(|key: &str| Ok(format!("vault:{key}")));
        let value = EnvKey::new("ANYTHING").resolve_with(Some(&vault)).unwrap();
        assert_eq!(value, "vault:ANYTHING");
    }

    #[test]
    fn test_deserializes_from_plain_string() {
        let key: EnvKey = serde_json::from_str("\"API_TOKEN\"").unwrap();
        assert_eq!(key.key(), "API_TOKEN");
    }
}
