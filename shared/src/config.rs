//! Configuration management for the media request bridge.

use std::env;

use crate::error::{Error, Result};
use crate::permissions::{PermissionGate, UserMappings};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend identity used for reads by unmapped callers
    pub default_backend_identity: String,
    /// Caller id to backend identity mappings
    pub user_mappings: UserMappings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let default_backend_identity = env::var("DEFAULT_BACKEND_IDENTITY")
            .map_err(|_| Error::Config("DEFAULT_BACKEND_IDENTITY is not set".to_string()))?;
        Self::from_values(&default_backend_identity, env::var("USER_MAPPINGS").ok().as_deref())
    }

    /// Build configuration from raw values; `user_mappings` is a JSON object.
    pub fn from_values(default_backend_identity: &str, user_mappings: Option<&str>) -> Result<Self> {
        let default_backend_identity = default_backend_identity.trim();
        if default_backend_identity.is_empty() {
            return Err(Error::Config(
                "DEFAULT_BACKEND_IDENTITY must not be empty".to_string(),
            ));
        }

        let user_mappings = match user_mappings.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| Error::Config(format!("USER_MAPPINGS is not a JSON object: {}", e)))?,
            None => UserMappings::default(),
        };

        Ok(Self {
            default_backend_identity: default_backend_identity.to_string(),
            user_mappings,
        })
    }

    pub fn gate(&self) -> PermissionGate {
        PermissionGate::new(self.default_backend_identity.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values() {
        let config = Config::from_values("1", Some(r#"{"ha-alice": "7", "ha-bob": "8"}"#)).unwrap();
        assert_eq!(config.user_mappings.len(), 2);
        assert_eq!(config.user_mappings.backend_identity("ha-bob"), Some("8"));
        assert_eq!(config.gate().default_backend_identity(), "1");
    }

    #[test]
    fn test_mappings_optional() {
        let config = Config::from_values("1", None).unwrap();
        assert!(config.user_mappings.is_empty());

        let config = Config::from_values("1", Some("  ")).unwrap();
        assert!(config.user_mappings.is_empty());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(Config::from_values(" ", None), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_values("1", Some("[1, 2]")),
            Err(Error::Config(_))
        ));
    }
}
