//! Per-invocation credential preparation.
//!
//! For each call the handler walks cached credential, refresh, exchange and
//! finally the interactive authorization request, stopping at the first step
//! that yields a usable credential.

use tracing::{debug, warn};

use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::credential_store::AuthCredentialStore;
use crate::tools::auth::exchanger::CredentialExchanger;
use crate::tools::auth::refresher::CredentialRefresher;
use crate::tools::auth::{is_interactive_scheme, scheme_kind, AuthConfig, AuthCredential, AuthScheme};
use crate::tools::tool_context::ToolContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPreparationState {
    /// The user must complete an authorization step first.
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthPreparationResult {
    pub state: AuthPreparationState,
    pub auth_scheme: Option<AuthScheme>,
    pub auth_credential: Option<AuthCredential>,
}

impl AuthPreparationResult {
    fn done(scheme: Option<AuthScheme>, credential: Option<AuthCredential>) -> Self {
        Self {
            state: AuthPreparationState::Done,
            auth_scheme: scheme,
            auth_credential: credential,
        }
    }

    fn pending(scheme: AuthScheme) -> Self {
        Self {
            state: AuthPreparationState::Pending,
            auth_scheme: Some(scheme),
            auth_credential: None,
        }
    }
}

pub struct ToolAuthHandler<'a> {
    context: &'a ToolContext<'a>,
    auth_scheme: Option<&'a AuthScheme>,
    auth_credential: Option<&'a AuthCredential>,
    refresher: &'a dyn CredentialRefresher,
    exchanger: &'a dyn CredentialExchanger,
}

impl<'a> ToolAuthHandler<'a> {
    pub fn new(
        context: &'a ToolContext<'a>,
        auth_scheme: Option<&'a AuthScheme>,
        auth_credential: Option<&'a AuthCredential>,
        refresher: &'a dyn CredentialRefresher,
        exchanger: &'a dyn CredentialExchanger,
    ) -> Self {
        Self {
            context,
            auth_scheme,
            auth_credential,
            refresher,
            exchanger,
        }
    }

    /// Resolve the credential for this invocation.
    ///
    /// Returns `Done` with the credential to apply (or none when the
    /// operation is unauthenticated), or `Pending` after registering a
    /// credential request with the context.
    pub async fn prepare_auth_credentials(&self) -> RestkitResult<AuthPreparationResult> {
        let Some(scheme) = self.auth_scheme else {
            return Ok(AuthPreparationResult::done(None, None));
        };

        let config = AuthConfig::new(scheme.clone(), self.auth_credential.cloned())?;
        let store = AuthCredentialStore::new(self.context.state());

        let mut candidate = store.get(&config).or_else(|| self.auth_credential.cloned());

        if let Some(credential) = candidate.take() {
            candidate = self.refresh_if_needed(&store, &config, scheme, credential).await;
        }

        if let Some(credential) = candidate {
            if let Some(usable) = self.exchanger.exchange(&credential, scheme).await? {
                if Some(&usable) != self.auth_credential {
                    store.set(&config, &usable)?;
                }
                return Ok(AuthPreparationResult::done(Some(scheme.clone()), Some(usable)));
            }
        }

        if let Some(response) = self.context.get_auth_response(&config) {
            debug!(scheme = scheme_kind(scheme), "using completed authorization response");
            store.set(&config, &response)?;
            return Ok(AuthPreparationResult::done(Some(scheme.clone()), Some(response)));
        }

        self.validate_interactive_config(scheme)?;
        self.context.request_credential(config);
        Ok(AuthPreparationResult::pending(scheme.clone()))
    }

    async fn refresh_if_needed(
        &self,
        store: &AuthCredentialStore<'_>,
        config: &AuthConfig,
        scheme: &AuthScheme,
        credential: AuthCredential,
    ) -> Option<AuthCredential> {
        if !self.refresher.is_refresh_needed(&credential, scheme) {
            return Some(credential);
        }

        match self.refresher.refresh(&credential, scheme).await {
            Ok(refreshed) => {
                if let Err(err) = store.set(config, &refreshed) {
                    warn!(error = %err, "failed to cache refreshed credential");
                }
                Some(refreshed)
            }
            Err(err) => {
                warn!(error = %err, "credential refresh failed");
                None
            }
        }
    }

    fn validate_interactive_config(&self, scheme: &AuthScheme) -> RestkitResult<()> {
        if !is_interactive_scheme(scheme) {
            return Ok(());
        }

        let complete = self
            .auth_credential
            .and_then(AuthCredential::as_oauth2)
            .is_some_and(|oauth2| oauth2.has_client_credentials());
        if complete {
            Ok(())
        } else {
            Err(RestkitError::AuthConfiguration {
                scheme: scheme_kind(scheme).to_string(),
                reason: "oauth2 client id and client secret are required".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::auth::{DefaultCredentialExchanger, OAuth2Credential, OAuth2Refresher};
    use crate::tools::execution_state::DefaultExecutionState;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn oauth_scheme() -> AuthScheme {
        serde_json::from_value(json!({
            "type": "oauth2",
            "flows": {"clientCredentials": {"tokenUrl": "http://127.0.0.1:9/token", "scopes": {}}}
        }))
        .unwrap()
    }

    fn client_only() -> AuthCredential {
        AuthCredential::OAuth2(OAuth2Credential {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..OAuth2Credential::default()
        })
    }

    #[tokio::test]
    async fn no_scheme_is_done_without_credential() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let refresher = OAuth2Refresher::new();
        let handler =
            ToolAuthHandler::new(&context, None, None, &refresher, &DefaultCredentialExchanger);

        let result = handler.prepare_auth_credentials().await.unwrap();
        assert_eq!(result.state, AuthPreparationState::Done);
        assert!(result.auth_credential.is_none());
    }

    #[tokio::test]
    async fn missing_token_registers_exactly_one_request() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let scheme = oauth_scheme();
        let credential = client_only();
        let refresher = OAuth2Refresher::new();
        let handler = ToolAuthHandler::new(
            &context,
            Some(&scheme),
            Some(&credential),
            &refresher,
            &DefaultCredentialExchanger,
        );

        let result = handler.prepare_auth_credentials().await.unwrap();
        assert_eq!(result.state, AuthPreparationState::Pending);
        assert_eq!(context.requested_credentials().len(), 1);
    }

    #[tokio::test]
    async fn auth_response_completes_and_is_cached() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let scheme = oauth_scheme();
        let credential = client_only();
        let config = AuthConfig::new(scheme.clone(), Some(credential.clone())).unwrap();
        let granted = AuthCredential::OAuth2(OAuth2Credential {
            access_token: Some("granted".into()),
            ..OAuth2Credential::default()
        });
        config.store_response(&state, &granted).unwrap();

        let refresher = OAuth2Refresher::new();
        let handler = ToolAuthHandler::new(
            &context,
            Some(&scheme),
            Some(&credential),
            &refresher,
            &DefaultCredentialExchanger,
        );
        let result = handler.prepare_auth_credentials().await.unwrap();

        assert_eq!(result.state, AuthPreparationState::Done);
        assert_eq!(result.auth_credential, Some(granted.clone()));
        assert_eq!(AuthCredentialStore::new(&state).get(&config), Some(granted));
        assert!(context.requested_credentials().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_interactive() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let scheme = oauth_scheme();
        let credential = AuthCredential::OAuth2(OAuth2Credential {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            access_token: Some("stale".into()),
            expires_at: Some(Utc::now() - Duration::minutes(1)),
            ..OAuth2Credential::default()
        });
        // No refresh token, so refresh fails without touching the network.
        let refresher = OAuth2Refresher::new();
        let handler = ToolAuthHandler::new(
            &context,
            Some(&scheme),
            Some(&credential),
            &refresher,
            &DefaultCredentialExchanger,
        );

        let result = handler.prepare_auth_credentials().await.unwrap();
        assert_eq!(result.state, AuthPreparationState::Pending);
    }

    #[tokio::test]
    async fn interactive_scheme_without_client_secret_is_rejected() {
        let state = DefaultExecutionState::new();
        let context = ToolContext::builder().with_state(&state).build().unwrap();
        let scheme = oauth_scheme();
        let credential = AuthCredential::OAuth2(OAuth2Credential {
            client_id: Some("id".into()),
            ..OAuth2Credential::default()
        });
        let refresher = OAuth2Refresher::new();
        let handler = ToolAuthHandler::new(
            &context,
            Some(&scheme),
            Some(&credential),
            &refresher,
            &DefaultCredentialExchanger,
        );

        let err = handler.prepare_auth_credentials().await.unwrap_err();
        assert!(matches!(err, RestkitError::AuthConfiguration { .. }));
        assert!(context.requested_credentials().is_empty());
    }
}
