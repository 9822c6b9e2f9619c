//! Credential handling for generated tools.
//!
//! - [`scheme`]: scheme/credential data model and request rendering
//! - [`credential_store`]: execution-state cache of usable credentials
//! - [`refresher`]: renewal of expired OAuth2 credentials
//! - [`exchanger`]: conversion of raw credentials into usable ones
//! - [`handler`]: the per-invocation preparation state machine

pub mod credential_store;
pub mod exchanger;
pub mod handler;
pub mod refresher;
pub mod scheme;

pub use credential_store::AuthCredentialStore;
pub use exchanger::{CredentialExchanger, DefaultCredentialExchanger};
pub use handler::{AuthPreparationResult, AuthPreparationState, ToolAuthHandler};
pub use refresher::{CredentialRefresher, OAuth2Refresher};
pub use scheme::{
    credential_key, credential_to_param, is_interactive_scheme, scheme_kind, AuthConfig,
    AuthCredential, AuthParam, AuthScheme, HttpCredentials, OAuth2Credential,
    ServiceAccountCredential,
};
