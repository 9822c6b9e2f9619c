use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::{AuthCredential, AuthScheme};

/// Turns a raw credential into one that can be applied to a request.
///
/// `Ok(None)` means the credential cannot be used without an interactive
/// authorization step.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait CredentialExchanger: MaybeSend + MaybeSync {
    async fn exchange(
        &self,
        credential: &AuthCredential,
        scheme: &AuthScheme,
    ) -> RestkitResult<Option<AuthCredential>>;
}

/// Passes through anything already usable.
///
/// Service accounts need a deployment-specific exchanger and are rejected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCredentialExchanger;

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl CredentialExchanger for DefaultCredentialExchanger {
    async fn exchange(
        &self,
        credential: &AuthCredential,
        _scheme: &AuthScheme,
    ) -> RestkitResult<Option<AuthCredential>> {
        match credential {
            AuthCredential::ApiKey { .. } | AuthCredential::Http { .. } => {
                Ok(Some(credential.clone()))
            }
            AuthCredential::OAuth2(oauth2) if oauth2.has_access_token() => {
                Ok(Some(credential.clone()))
            }
            AuthCredential::OAuth2(_) => Ok(None),
            AuthCredential::ServiceAccount(account) => Err(RestkitError::CredentialExchange {
                reason: format!(
                    "no exchanger configured for service account {}",
                    account.client_email
                ),
            }),
        }
    }
}
