//! Declared auth schemes, concrete credentials, and how a credential lands on a request.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use openapiv3::APIKeyLocation;
use serde::{Deserialize, Serialize};

use crate::errors::{RestkitError, RestkitResult};
use crate::observability::fingerprint;
use crate::tools::execution_state::ExecutionState;

/// The authentication mechanism an API declares (`components.securitySchemes` entry).
pub type AuthScheme = openapiv3::SecurityScheme;

/// Short, stable name of a scheme's kind, used in keys and messages.
pub fn scheme_kind(scheme: &AuthScheme) -> &'static str {
    match scheme {
        AuthScheme::APIKey { .. } => "api_key",
        AuthScheme::HTTP { .. } => "http",
        AuthScheme::OAuth2 { .. } => "oauth2",
        AuthScheme::OpenIDConnect { .. } => "open_id_connect",
    }
}

/// Whether the scheme can require an interactive, user-facing exchange.
pub fn is_interactive_scheme(scheme: &AuthScheme) -> bool {
    matches!(
        scheme,
        AuthScheme::OAuth2 { .. } | AuthScheme::OpenIDConnect { .. }
    )
}

/// Username/password or token material for HTTP auth schemes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl OAuth2Credential {
    /// Expired once the current time reaches `expires_at`. No expiry means never expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_client_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|v| !v.is_empty())
            && self.client_secret.as_deref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// Concrete secret material matching an [`AuthScheme`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum AuthCredential {
    ApiKey {
        value: String,
        /// Overrides the scheme's declared location.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<APIKeyLocation>,
        /// Overrides the scheme's declared parameter name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Http {
        scheme: String,
        credentials: HttpCredentials,
    },
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Credential),
    ServiceAccount(ServiceAccountCredential),
}

impl AuthCredential {
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::ApiKey {
            value: value.into(),
            location: None,
            name: None,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Http {
            scheme: "bearer".to_string(),
            credentials: HttpCredentials {
                token: Some(token.into()),
                ..HttpCredentials::default()
            },
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Http {
            scheme: "basic".to_string(),
            credentials: HttpCredentials {
                username: Some(username.into()),
                password: Some(password.into()),
                token: None,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApiKey { .. } => "api_key",
            Self::Http { .. } => "http",
            Self::OAuth2(_) => "oauth2",
            Self::ServiceAccount(_) => "service_account",
        }
    }

    pub fn as_oauth2(&self) -> Option<&OAuth2Credential> {
        match self {
            Self::OAuth2(oauth2) => Some(oauth2),
            _ => None,
        }
    }
}

/// A credential rendered as one concrete request part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthParam {
    Header { name: String, value: String },
    Query { name: String, value: String },
    Cookie { name: String, value: String },
}

fn bearer_header(token: &str) -> AuthParam {
    AuthParam::Header {
        name: "Authorization".to_string(),
        value: format!("Bearer {token}"),
    }
}

fn mismatch(scheme: &AuthScheme, credential: &AuthCredential) -> RestkitError {
    RestkitError::AuthConfiguration {
        scheme: scheme_kind(scheme).to_string(),
        reason: format!(
            "a {} credential cannot be used with this scheme",
            credential.kind()
        ),
    }
}

/// Render `credential` as the request part `scheme` asks for.
///
/// Returns `Ok(None)` when the credential carries nothing to send yet (an
/// OAuth2 credential without an access token).
pub fn credential_to_param(
    scheme: &AuthScheme,
    credential: &AuthCredential,
) -> RestkitResult<Option<AuthParam>> {
    match (scheme, credential) {
        (
            AuthScheme::APIKey { location, name, .. },
            AuthCredential::ApiKey {
                value,
                location: override_location,
                name: override_name,
            },
        ) => {
            let name = override_name.clone().unwrap_or_else(|| name.clone());
            let value = value.clone();
            let param = match override_location.as_ref().unwrap_or(location) {
                APIKeyLocation::Header => AuthParam::Header { name, value },
                APIKeyLocation::Query => AuthParam::Query { name, value },
                APIKeyLocation::Cookie => AuthParam::Cookie { name, value },
            };
            Ok(Some(param))
        }
        (AuthScheme::HTTP { .. }, AuthCredential::Http { scheme, credentials }) => {
            http_param(scheme, credentials).map(Some)
        }
        (
            AuthScheme::HTTP { .. } | AuthScheme::OAuth2 { .. } | AuthScheme::OpenIDConnect { .. },
            AuthCredential::OAuth2(oauth2),
        ) => Ok(oauth2
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(bearer_header)),
        (AuthScheme::OAuth2 { .. } | AuthScheme::OpenIDConnect { .. }, AuthCredential::Http {
            credentials,
            ..
        }) => Ok(credentials.token.as_deref().map(bearer_header)),
        _ => Err(mismatch(scheme, credential)),
    }
}

fn http_param(scheme: &str, credentials: &HttpCredentials) -> RestkitResult<AuthParam> {
    let missing = |field: &str| RestkitError::AuthConfiguration {
        scheme: "http".to_string(),
        reason: format!("{scheme} credentials are missing '{field}'"),
    };

    if scheme.eq_ignore_ascii_case("basic") {
        let username = credentials.username.as_deref().ok_or_else(|| missing("username"))?;
        let password = credentials.password.as_deref().unwrap_or_default();
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        return Ok(AuthParam::Header {
            name: "Authorization".to_string(),
            value: format!("Basic {encoded}"),
        });
    }

    let token = credentials.token.as_deref().ok_or_else(|| missing("token"))?;
    if scheme.eq_ignore_ascii_case("bearer") {
        return Ok(bearer_header(token));
    }

    let mut label = scheme.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Ok(AuthParam::Header {
        name: "Authorization".to_string(),
        value: format!("{label} {token}"),
    })
}

fn short_digest<T: Serialize>(value: &T) -> RestkitResult<String> {
    Ok(fingerprint(serde_json::to_vec(value)?))
}

/// Deterministic key for a (scheme, raw credential) pair.
///
/// Built from the serialized scheme and serialized credential, so the same
/// logical credential maps to the same slot across invocations.
pub fn credential_key(
    scheme: &AuthScheme,
    credential: Option<&AuthCredential>,
) -> RestkitResult<String> {
    let scheme_part = format!("{}_{}", scheme_kind(scheme), short_digest(scheme)?);
    let credential_part = match credential {
        Some(credential) => format!("{}_{}", credential.kind(), short_digest(credential)?),
        None => "none".to_string(),
    };
    Ok(format!("restkit_{scheme_part}_{credential_part}"))
}

/// What gets registered with the context when user authorization is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub auth_scheme: AuthScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_auth_credential: Option<AuthCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_auth_credential: Option<AuthCredential>,
    pub credential_key: String,
}

impl AuthConfig {
    pub fn new(
        auth_scheme: AuthScheme,
        raw_auth_credential: Option<AuthCredential>,
    ) -> RestkitResult<Self> {
        let credential_key = credential_key(&auth_scheme, raw_auth_credential.as_ref())?;
        Ok(Self {
            auth_scheme,
            raw_auth_credential,
            exchanged_auth_credential: None,
            credential_key,
        })
    }

    /// State key under which the runtime places the completed authorization.
    pub fn response_state_key(&self) -> String {
        format!("temp:{}", self.credential_key)
    }

    /// Record the credential obtained from the user-facing authorization step.
    pub fn store_response(
        &self,
        state: &dyn ExecutionState,
        credential: &AuthCredential,
    ) -> RestkitResult<()> {
        state.set_state(&self.response_state_key(), serde_json::to_value(credential)?);
        Ok(())
    }
}
