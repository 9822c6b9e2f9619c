/// Main error type for spec compilation, configuration and credential handling.
///
/// Invocation-time failures (HTTP errors, network errors) never surface as a
/// `RestkitError` from a tool call; they are folded into a [`ToolResult`](crate::tools::ToolResult).
#[derive(Debug, thiserror::Error)]
pub enum RestkitError {
    // === Spec Compilation Errors ===
    #[error("Unresolvable reference '{reference}': {reason}")]
    SpecResolution { reference: String, reason: String },

    #[error("Failed to load OpenAPI spec '{source_name}': {reason}")]
    SpecLoad { source_name: String, reason: String },

    // === Auth Errors ===
    #[error("Auth configuration error ({scheme}): {reason}")]
    AuthConfiguration { scheme: String, reason: String },

    #[error("Credential refresh failed: {reason}")]
    CredentialRefresh { reason: String },

    #[error("Credential exchange failed: {reason}")]
    CredentialExchange { reason: String },

    // === Configuration Errors ===
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Missing configuration: {field}")]
    MissingConfiguration { field: String },

    // === Network/IO Errors ===
    #[error("Network error: {operation}: {reason}")]
    Network { operation: String, reason: String },

    #[error("Serialization error: {format}: {reason}")]
    Serialization { format: String, reason: String },

    // === Waiting ===
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Internal error: {component}: {reason}")]
    Internal { component: String, reason: String },
}

/// Convenience type alias
pub type RestkitResult<T> = std::result::Result<T, RestkitError>;

impl RestkitError {
    pub(crate) fn spec_load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpecLoad {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Convert `RestkitError` to `ToolResult` for tool execution contexts
impl From<RestkitError> for crate::tools::ToolResult {
    fn from(error: RestkitError) -> Self {
        Self::error(error.to_string())
    }
}

impl From<serde_json::Error> for RestkitError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            format: "json".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RestkitError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            format: "yaml".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<std::io::Error> for RestkitError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal {
            component: "io".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for RestkitError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network {
            operation: "http_request".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<url::ParseError> for RestkitError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidConfiguration {
            field: "url".to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_to_string_contains_context() {
        let err = RestkitError::SpecResolution {
            reference: "other.yaml#/Pet".into(),
            reason: "external references are not supported".into(),
        };
        let message = err.to_string();
        assert!(message.contains("other.yaml#/Pet"));
        assert!(message.contains("external references"));
    }

    #[test]
    fn error_converts_into_error_tool_result() {
        let result: crate::tools::ToolResult = RestkitError::MissingConfiguration {
            field: "spec".into(),
        }
        .into();
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("spec"));
    }
}
