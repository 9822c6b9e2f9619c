use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::errors::{RestkitError, RestkitResult};

const TOOLSET_SCHEMA: &str = include_str!("schema/toolset.json");

/// JSON Schema for toolset configuration validation
static TOOLSET_VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    let schema: Value =
        serde_json::from_str(TOOLSET_SCHEMA).expect("Failed to parse embedded toolset schema");
    jsonschema::validator_for(&schema).expect("Failed to compile toolset schema")
});

/// Validate a raw configuration document against the embedded schema.
pub fn validate_config(config: &Value) -> RestkitResult<()> {
    TOOLSET_VALIDATOR
        .validate(config)
        .map_err(|error| RestkitError::InvalidConfiguration {
            field: "config".to_string(),
            reason: format!("Schema validation failed: {error}"),
        })
}

/// Get the JSON schema as a Value
pub fn get_schema() -> &'static Value {
    static SCHEMA_VALUE: Lazy<Value> = Lazy::new(|| {
        serde_json::from_str(TOOLSET_SCHEMA).expect("Failed to parse embedded toolset schema")
    });

    &SCHEMA_VALUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_minimal_config() {
        let config = json!({"name": "pets", "spec": {"file": "pets.yaml"}});
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_two_spec_sources() {
        let config = json!({
            "name": "pets",
            "spec": {"file": "pets.yaml", "url": "https://example.com/openapi.json"}
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_literal_secret_in_env_field() {
        let config = json!({
            "name": "pets",
            "spec": {"file": "pets.yaml"},
            "auth": {"credential": {"type": "api_key", "value_env": "sk-live 123"}}
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn schema_is_exposed() {
        assert_eq!(get_schema()["$id"], "urn:restkit-toolset");
    }
}
