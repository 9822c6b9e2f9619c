use tracing::warn;

use crate::errors::RestkitResult;
use crate::tools::auth::{AuthConfig, AuthCredential};
use crate::tools::execution_state::ExecutionState;

/// Caches exchanged or refreshed credentials in execution state.
///
/// Entries live under temporary keys derived from the credential key, so they
/// never collide with the auth response the runtime writes for the same config.
pub struct AuthCredentialStore<'a> {
    state: &'a dyn ExecutionState,
}

impl<'a> AuthCredentialStore<'a> {
    pub fn new(state: &'a dyn ExecutionState) -> Self {
        Self { state }
    }

    pub fn storage_key(config: &AuthConfig) -> String {
        format!("temp:{}_existing_exchanged_credential", config.credential_key)
    }

    pub fn get(&self, config: &AuthConfig) -> Option<AuthCredential> {
        let key = Self::storage_key(config);
        let value = self.state.get_state(&key)?;
        match serde_json::from_value(value) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(key = %key, error = %err, "dropping unreadable cached credential");
                self.state.remove_state(&key);
                None
            }
        }
    }

    pub fn set(&self, config: &AuthConfig, credential: &AuthCredential) -> RestkitResult<()> {
        self.state
            .set_state(&Self::storage_key(config), serde_json::to_value(credential)?);
        Ok(())
    }

    pub fn remove(&self, config: &AuthConfig) -> Option<AuthCredential> {
        self.state
            .remove_state(&Self::storage_key(config))
            .and_then(|value| serde_json::from_value(value).ok())
    }
}
