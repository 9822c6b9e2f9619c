//! ToolContext - the limited view of the caller's runtime that a tool receives.
//!
//! Tools read and write execution-scoped state, see per-request headers, and
//! register credential requests when an interactive authorization is required.
//! The caller owns everything behind the context.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::{AuthConfig, AuthCredential};
use crate::tools::execution_state::ExecutionState;

/// Execution context handed to [`BaseTool::run_async`](crate::tools::BaseTool::run_async).
pub struct ToolContext<'a> {
    state: &'a dyn ExecutionState,
    function_call_id: Option<String>,
    request_headers: HashMap<String, String>,
    requested_credentials: Mutex<Vec<AuthConfig>>,
}

impl<'a> ToolContext<'a> {
    pub fn builder() -> ToolContextBuilder<'a> {
        ToolContextBuilder::default()
    }

    pub fn state(&self) -> &dyn ExecutionState {
        self.state
    }

    pub fn function_call_id(&self) -> Option<&str> {
        self.function_call_id.as_deref()
    }

    /// Headers the caller wants forwarded on every request made under this context.
    pub fn request_headers(&self) -> &HashMap<String, String> {
        &self.request_headers
    }

    /// Register that `config` needs a user-facing authorization step.
    pub fn request_credential(&self, config: AuthConfig) {
        match self.requested_credentials.lock() {
            Ok(mut requested) => requested.push(config),
            Err(poisoned) => poisoned.into_inner().push(config),
        }
    }

    /// Credential requests registered so far, in registration order.
    pub fn requested_credentials(&self) -> Vec<AuthConfig> {
        match self.requested_credentials.lock() {
            Ok(requested) => requested.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The credential the runtime placed in state after the user completed authorization.
    pub fn get_auth_response(&self, config: &AuthConfig) -> Option<AuthCredential> {
        let key = config.response_state_key();
        let value = self.state.get_state(&key)?;
        match serde_json::from_value(value) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(key = %key, error = %err, "ignoring malformed auth response");
                None
            }
        }
    }
}

#[derive(Default)]
pub struct ToolContextBuilder<'a> {
    state: Option<&'a dyn ExecutionState>,
    function_call_id: Option<String>,
    request_headers: HashMap<String, String>,
}

impl<'a> ToolContextBuilder<'a> {
    #[must_use]
    pub fn with_state(mut self, state: &'a dyn ExecutionState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_function_call_id(mut self, id: impl Into<String>) -> Self {
        self.function_call_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_request_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.request_headers.extend(headers);
        self
    }

    pub fn build(self) -> RestkitResult<ToolContext<'a>> {
        let state = self.state.ok_or_else(|| RestkitError::MissingConfiguration {
            field: "state".to_string(),
        })?;

        Ok(ToolContext {
            state,
            function_call_id: self.function_call_id,
            request_headers: self.request_headers,
            requested_credentials: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::auth::AuthScheme;
    use crate::tools::execution_state::DefaultExecutionState;
    use serde_json::json;

    fn bearer_config() -> AuthConfig {
        let scheme: AuthScheme =
            serde_json::from_value(json!({"type": "http", "scheme": "bearer"})).unwrap();
        AuthConfig::new(scheme, None).unwrap()
    }

    #[test]
    fn build_requires_state() {
        let err = ToolContext::builder().build().err().unwrap();
        assert!(matches!(err, RestkitError::MissingConfiguration { .. }));
    }

    #[test]
    fn credential_requests_accumulate() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder()
            .with_state(&state)
            .with_function_call_id("call-1")
            .build()
            .unwrap();

        assert!(context.requested_credentials().is_empty());
        context.request_credential(bearer_config());
        assert_eq!(context.requested_credentials().len(), 1);
        assert_eq!(context.function_call_id(), Some("call-1"));
    }

    #[test]
    fn auth_response_is_read_from_state() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let config = bearer_config();

        assert!(context.get_auth_response(&config).is_none());
        config
            .store_response(&state, &AuthCredential::bearer("granted"))
            .unwrap();
        assert_eq!(
            context.get_auth_response(&config),
            Some(AuthCredential::bearer("granted"))
        );
    }

    #[test]
    fn malformed_auth_response_is_ignored() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let config = bearer_config();
        state.set_state(&config.response_state_key(), json!("not a credential"));
        assert!(context.get_auth_response(&config).is_none());
    }
}
