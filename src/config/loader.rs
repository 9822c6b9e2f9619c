use std::path::Path;

use serde_json::Value;

use crate::config::schema::validate_config;
use crate::config::ToolsetConfig;
use crate::errors::{RestkitError, RestkitResult};

/// Loads toolset configurations from YAML/JSON.
///
/// Secrets are not resolved here: credential fields hold environment variable
/// names, looked up by [`ToolsetConfig::to_options`].
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_yaml(yaml: &str) -> RestkitResult<ToolsetConfig> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn from_json(json: &str) -> RestkitResult<ToolsetConfig> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Pick the format from the extension; `.json` is JSON, anything else YAML.
    pub fn from_file(path: impl AsRef<Path>) -> RestkitResult<ToolsetConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RestkitError::InvalidConfiguration {
                field: path.display().to_string(),
                reason: format!("failed to read config: {e}"),
            }
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    fn from_value(value: Value) -> RestkitResult<ToolsetConfig> {
        validate_config(&value)?;
        let config: ToolsetConfig = serde_json::from_value(value)?;
        Self::validate_business_logic(&config)?;
        Ok(config)
    }

    fn validate_business_logic(config: &ToolsetConfig) -> RestkitResult<()> {
        if config.name.trim().is_empty() {
            return Err(RestkitError::InvalidConfiguration {
                field: "name".to_string(),
                reason: "Toolset name cannot be empty".to_string(),
            });
        }
        if let Some(base_url) = &config.base_url {
            url::Url::parse(base_url).map_err(|e| RestkitError::InvalidConfiguration {
                field: "base_url".to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
