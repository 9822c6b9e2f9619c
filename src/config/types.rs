use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::env_resolver::{EnvKey, EnvResolverFn};
use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::{
    AuthCredential, AuthScheme, HttpCredentials, OAuth2Credential, ServiceAccountCredential,
};
use crate::tools::openapi::{DeclarationFormat, OpenApiSpec, ToolsetOptions};

/// One OpenAPI toolset, as described in YAML or JSON.
///
/// ```yaml
/// name: petstore
/// spec:
///   file: specs/petstore.yaml
/// timeout_secs: 10
/// default_headers:
///   X-Tenant: acme
/// auth:
///   scheme_name: bearerAuth
///   credential:
///     type: http
///     scheme: bearer
///     token_env: PETSTORE_TOKEN
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsetConfig {
    pub name: String,

    pub spec: SpecSource,

    /// Overrides the document's first server URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub declaration_format: DeclarationFormat,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub default_headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSettings>,
}

/// Where the OpenAPI document comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecSource {
    File(PathBuf),
    Url(String),
    Inline {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// Entry of `components.securitySchemes` to apply to every operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<String>,

    /// Inline Security Scheme object; wins over `scheme_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<AuthScheme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialConfig>,
}

/// Credential material. Secrets are environment variable names, never values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialConfig {
    ApiKey {
        value_env: EnvKey,
    },
    Http {
        scheme: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<EnvKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password_env: Option<EnvKey>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id_env: Option<EnvKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_secret_env: Option<EnvKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_token_env: Option<EnvKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token_env: Option<EnvKey>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        scopes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        redirect_uri: Option<String>,
    },
    ServiceAccount {
        client_email: String,
        private_key_env: EnvKey,
        token_uri: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        scopes: Vec<String>,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

fn resolve_optional(
    key: Option<&EnvKey>,
    resolver: Option<&EnvResolverFn>,
) -> RestkitResult<Option<String>> {
    key.map(|key| key.resolve_with(resolver)).transpose()
}

impl CredentialConfig {
    /// Look up every referenced secret and build the credential.
    pub fn resolve(&self, resolver: Option<&EnvResolverFn>) -> RestkitResult<AuthCredential> {
        match self {
            Self::ApiKey { value_env } => {
                Ok(AuthCredential::api_key(value_env.resolve_with(resolver)?))
            }
            Self::Http {
                scheme,
                token_env,
                username,
                password_env,
            } => Ok(AuthCredential::Http {
                scheme: scheme.clone(),
                credentials: HttpCredentials {
                    username: username.clone(),
                    password: resolve_optional(password_env.as_ref(), resolver)?,
                    token: resolve_optional(token_env.as_ref(), resolver)?,
                },
            }),
            Self::OAuth2 {
                client_id_env,
                client_secret_env,
                access_token_env,
                refresh_token_env,
                scopes,
                redirect_uri,
            } => Ok(AuthCredential::OAuth2(OAuth2Credential {
                client_id: resolve_optional(client_id_env.as_ref(), resolver)?,
                client_secret: resolve_optional(client_secret_env.as_ref(), resolver)?,
                access_token: resolve_optional(access_token_env.as_ref(), resolver)?,
                refresh_token: resolve_optional(refresh_token_env.as_ref(), resolver)?,
                redirect_uri: redirect_uri.clone(),
                scopes: scopes.clone(),
                ..OAuth2Credential::default()
            })),
            Self::ServiceAccount {
                client_email,
                private_key_env,
                token_uri,
                scopes,
            } => Ok(AuthCredential::ServiceAccount(ServiceAccountCredential {
                client_email: client_email.clone(),
                private_key: private_key_env.resolve_with(resolver)?,
                token_uri: token_uri.clone(),
                scopes: scopes.clone(),
            })),
        }
    }
}

impl ToolsetConfig {
    /// Fetch or read the document this config points at.
    pub async fn load_spec(&self) -> RestkitResult<OpenApiSpec> {
        match &self.spec {
            SpecSource::File(path) => OpenApiSpec::from_file(path),
            SpecSource::Url(url) => OpenApiSpec::from_url(url).await,
            SpecSource::Inline { content, base_url } => {
                let spec = OpenApiSpec::from_str(content)?;
                Ok(match base_url {
                    Some(base_url) => spec.with_base_url(base_url.clone()),
                    None => spec,
                })
            }
        }
    }

    /// Toolset options with every secret resolved.
    pub fn to_options(&self, resolver: Option<&EnvResolverFn>) -> RestkitResult<ToolsetOptions> {
        if self.timeout_secs == 0 {
            return Err(RestkitError::InvalidConfiguration {
                field: "timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let mut options = ToolsetOptions::default()
            .with_declaration_format(self.declaration_format)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        options.default_headers = self.default_headers.clone();
        options.base_url = self.base_url.clone();

        if let Some(auth) = &self.auth {
            options.auth_scheme = auth.scheme.clone();
            options.auth_scheme_name = auth.scheme_name.clone();
            options.auth_credential = auth
                .credential
                .as_ref()
                .map(|credential| credential.resolve(resolver))
                .transpose()?;
        }
        Ok(options)
    }
}
