//! YAML/JSON configuration for OpenAPI toolsets.
//!
//! Configurations are validated against an embedded JSON Schema before they
//! are parsed into [`ToolsetConfig`]. Secrets are referenced by environment
//! variable name and resolved only when the toolset is built.

pub mod env_resolver;
pub mod loader;
pub mod schema;
pub mod types;

pub use env_resolver::{default_env_resolver, EnvKey, EnvResolverFn};
pub use loader::ConfigLoader;
pub use schema::{get_schema, validate_config};
pub use types::{AuthSettings, CredentialConfig, SpecSource, ToolsetConfig};
