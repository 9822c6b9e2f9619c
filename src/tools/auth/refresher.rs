//! Renewal of expired credentials.

use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::{AuthCredential, AuthScheme, OAuth2Credential};

/// Renews credentials whose validity window has passed.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait CredentialRefresher: MaybeSend + MaybeSync {
    /// Whether `credential` has to be refreshed before use.
    fn is_refresh_needed(&self, credential: &AuthCredential, scheme: &AuthScheme) -> bool;

    /// Produce a renewed credential. Errors mean the credential is unusable.
    async fn refresh(
        &self,
        credential: &AuthCredential,
        scheme: &AuthScheme,
    ) -> RestkitResult<AuthCredential>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refreshes OAuth2 credentials with a `refresh_token` grant against the scheme's token endpoint.
#[derive(Debug, Clone, Default)]
pub struct OAuth2Refresher {
    http_client: reqwest::Client,
    token_url: Option<String>,
}

impl OAuth2Refresher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Use a fixed token endpoint instead of the one the scheme declares.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    fn token_endpoint(&self, scheme: &AuthScheme) -> RestkitResult<String> {
        if let Some(url) = &self.token_url {
            return Ok(url.clone());
        }

        let declared = match scheme {
            AuthScheme::OAuth2 { flows, .. } => flows
                .authorization_code
                .as_ref()
                .map(|flow| flow.refresh_url.clone().unwrap_or_else(|| flow.token_url.clone()))
                .or_else(|| {
                    flows
                        .client_credentials
                        .as_ref()
                        .map(|flow| flow.refresh_url.clone().unwrap_or_else(|| flow.token_url.clone()))
                })
                .or_else(|| {
                    flows
                        .password
                        .as_ref()
                        .map(|flow| flow.refresh_url.clone().unwrap_or_else(|| flow.token_url.clone()))
                })
                .or_else(|| flows.implicit.as_ref().and_then(|flow| flow.refresh_url.clone())),
            _ => None,
        };

        declared.ok_or_else(|| RestkitError::CredentialRefresh {
            reason: "scheme declares no token endpoint".to_string(),
        })
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl CredentialRefresher for OAuth2Refresher {
    fn is_refresh_needed(&self, credential: &AuthCredential, _scheme: &AuthScheme) -> bool {
        credential
            .as_oauth2()
            .is_some_and(|oauth2| oauth2.is_expired_at(Utc::now()))
    }

    async fn refresh(
        &self,
        credential: &AuthCredential,
        scheme: &AuthScheme,
    ) -> RestkitResult<AuthCredential> {
        let oauth2 = credential
            .as_oauth2()
            .ok_or_else(|| RestkitError::CredentialRefresh {
                reason: format!("cannot refresh a {} credential", credential.kind()),
            })?;
        let refresh_token =
            oauth2
                .refresh_token
                .as_deref()
                .ok_or_else(|| RestkitError::CredentialRefresh {
                    reason: "credential has no refresh token".to_string(),
                })?;
        let token_url = self.token_endpoint(scheme)?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if let Some(client_id) = &oauth2.client_id {
            form.push(("client_id", client_id.clone()));
        }
        if let Some(client_secret) = &oauth2.client_secret {
            form.push(("client_secret", client_secret.clone()));
        }
        if !oauth2.scopes.is_empty() {
            form.push(("scope", oauth2.scopes.join(" ")));
        }

        debug!(token_url = %token_url, "requesting oauth2 token refresh");
        let response = self
            .http_client
            .post(&token_url)
            .form(&form)
            .send()
            .await
            .map_err(|err| RestkitError::CredentialRefresh {
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestkitError::CredentialRefresh {
                reason: format!("token endpoint returned {}", status.as_u16()),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|err| RestkitError::CredentialRefresh {
                    reason: format!("invalid token response: {err}"),
                })?;

        info!("oauth2 credential refreshed");
        Ok(AuthCredential::OAuth2(OAuth2Credential {
            access_token: Some(token.access_token),
            refresh_token: token.refresh_token.or_else(|| oauth2.refresh_token.clone()),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs.max(0))),
            ..oauth2.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn oauth_scheme() -> AuthScheme {
        serde_json::from_value(json!({
            "type": "oauth2",
            "flows": {
                "authorizationCode": {
                    "authorizationUrl": "https://auth.example.com/authorize",
                    "tokenUrl": "https://auth.example.com/token",
                    "scopes": {}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn refresh_needed_only_for_expired_oauth2() {
        let refresher = OAuth2Refresher::new();
        let scheme = oauth_scheme();
        let expired = AuthCredential::OAuth2(OAuth2Credential {
            access_token: Some("old".into()),
            expires_at: Some(Utc::now() - ChronoDuration::minutes(5)),
            ..OAuth2Credential::default()
        });
        let fresh = AuthCredential::OAuth2(OAuth2Credential {
            access_token: Some("new".into()),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            ..OAuth2Credential::default()
        });

        assert!(refresher.is_refresh_needed(&expired, &scheme));
        assert!(!refresher.is_refresh_needed(&fresh, &scheme));
        assert!(!refresher.is_refresh_needed(&AuthCredential::api_key("k"), &scheme));
    }

    #[test]
    fn token_endpoint_comes_from_declared_flow() {
        let refresher = OAuth2Refresher::new();
        assert_eq!(
            refresher.token_endpoint(&oauth_scheme()).unwrap(),
            "https://auth.example.com/token"
        );

        let overridden = OAuth2Refresher::new().with_token_url("http://127.0.0.1/token");
        assert_eq!(
            overridden.token_endpoint(&oauth_scheme()).unwrap(),
            "http://127.0.0.1/token"
        );
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let credential = AuthCredential::OAuth2(OAuth2Credential {
            access_token: Some("old".into()),
            ..OAuth2Credential::default()
        });
        let err = OAuth2Refresher::new()
            .refresh(&credential, &oauth_scheme())
            .await
            .unwrap_err();
        assert!(matches!(err, RestkitError::CredentialRefresh { .. }));
    }
}
