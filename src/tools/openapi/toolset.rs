//! OpenAPI toolset: one [`RestApiTool`] per operation of a document.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::operation_tool::{DeclarationFormat, HeaderProvider, RestApiTool, ToolRuntime};
use super::spec::OpenApiSpec;
use crate::config::{EnvResolverFn, ToolsetConfig};
use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::{
    scheme_kind, AuthCredential, AuthScheme, CredentialExchanger, CredentialRefresher,
    DefaultCredentialExchanger, OAuth2Refresher,
};
use crate::tools::{BaseTool, BaseToolset};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Construction options shared by all tools of a toolset.
#[derive(Clone)]
pub struct ToolsetOptions {
    /// Applied to every operation, replacing the document's declared scheme.
    pub auth_scheme: Option<AuthScheme>,
    /// Look the scheme up in `components.securitySchemes` by name.
    pub auth_scheme_name: Option<String>,
    pub auth_credential: Option<AuthCredential>,
    pub default_headers: HashMap<String, String>,
    pub header_provider: Option<HeaderProvider>,
    pub declaration_format: DeclarationFormat,
    pub timeout: Duration,
    pub base_url: Option<String>,
    pub refresher: Option<Arc<dyn CredentialRefresher>>,
    pub exchanger: Option<Arc<dyn CredentialExchanger>>,
    pub http_client: Option<reqwest::Client>,
}

impl Default for ToolsetOptions {
    fn default() -> Self {
        Self {
            auth_scheme: None,
            auth_scheme_name: None,
            auth_credential: None,
            default_headers: HashMap::new(),
            header_provider: None,
            declaration_format: DeclarationFormat::default(),
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
            refresher: None,
            exchanger: None,
            http_client: None,
        }
    }
}

impl ToolsetOptions {
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = Some(scheme);
        self
    }

    #[must_use]
    pub fn with_auth_scheme_name(mut self, name: impl Into<String>) -> Self {
        self.auth_scheme_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_auth_credential(mut self, credential: AuthCredential) -> Self {
        self.auth_credential = Some(credential);
        self
    }

    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_header_provider(mut self, provider: HeaderProvider) -> Self {
        self.header_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_declaration_format(mut self, format: DeclarationFormat) -> Self {
        self.declaration_format = format;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    #[must_use]
    pub fn with_exchanger(mut self, exchanger: Arc<dyn CredentialExchanger>) -> Self {
        self.exchanger = Some(exchanger);
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

/// Generates one tool per API operation.
///
/// ```no_run
/// use restkit::tools::auth::AuthCredential;
/// use restkit::tools::openapi::{OpenApiToolSet, ToolsetOptions};
///
/// let options = ToolsetOptions::default()
///     .with_auth_credential(AuthCredential::bearer("my-token"));
/// let toolset = OpenApiToolSet::from_file("petstore_api", "specs/petstore.yaml", options).unwrap();
/// ```
pub struct OpenApiToolSet {
    name: String,
    source: String,
    tools: Vec<Arc<RestApiTool>>,
}

impl OpenApiToolSet {
    pub fn from_file(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        options: ToolsetOptions,
    ) -> RestkitResult<Self> {
        Self::from_spec(name, OpenApiSpec::from_file(path)?, options)
    }

    pub async fn from_url(
        name: impl Into<String>,
        url: &str,
        options: ToolsetOptions,
    ) -> RestkitResult<Self> {
        let spec = match &options.http_client {
            Some(client) => OpenApiSpec::from_url_with_client(client, url).await?,
            None => OpenApiSpec::from_url(url).await?,
        };
        Self::from_spec(name, spec, options)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(
        name: impl Into<String>,
        content: &str,
        options: ToolsetOptions,
    ) -> RestkitResult<Self> {
        Self::from_spec(name, OpenApiSpec::from_str(content)?, options)
    }

    /// Build a toolset described by a configuration file.
    ///
    /// Secrets are resolved through `resolver`, or the process environment.
    pub async fn from_config(
        config: &ToolsetConfig,
        resolver: Option<&EnvResolverFn>,
    ) -> RestkitResult<Self> {
        let options = config.to_options(resolver)?;
        let spec = config.load_spec().await?;
        Self::from_spec(config.name.clone(), spec, options)
    }

    /// Compile `spec` into tools.
    ///
    /// Fails on unresolvable references and on an explicit OAuth2 credential
    /// that carries neither an access token nor client credentials.
    pub fn from_spec(
        name: impl Into<String>,
        spec: OpenApiSpec,
        options: ToolsetOptions,
    ) -> RestkitResult<Self> {
        let name = name.into();
        let spec = match &options.base_url {
            Some(base_url) => spec.with_base_url(base_url.clone()),
            None => spec,
        };

        let toolset_scheme = toolset_scheme(&spec, &options)?;
        if let Some(credential) = &options.auth_credential {
            validate_credential(toolset_scheme.as_ref(), credential)?;
        }

        let runtime = build_runtime(&options)?;
        let mut tools = Vec::new();
        for mut operation in spec.operations()? {
            let scheme = toolset_scheme
                .clone()
                .or_else(|| operation.auth_scheme.clone());
            let credential = if scheme.is_some() {
                options.auth_credential.clone()
            } else {
                None
            };
            operation.set_auth(scheme, credential);
            tools.push(Arc::new(RestApiTool::new(operation, runtime.clone())));
        }

        info!(
            toolset = %name,
            source = %spec.source(),
            tools = tools.len(),
            "built openapi toolset"
        );

        Ok(Self {
            name,
            source: spec.source().to_string(),
            tools,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path, URL or `<inline>` the document was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tools(&self) -> &[Arc<RestApiTool>] {
        &self.tools
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<RestApiTool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }
}

fn toolset_scheme(spec: &OpenApiSpec, options: &ToolsetOptions) -> RestkitResult<Option<AuthScheme>> {
    if let Some(scheme) = &options.auth_scheme {
        return Ok(Some(scheme.clone()));
    }
    let Some(name) = &options.auth_scheme_name else {
        return Ok(None);
    };
    let raw = spec
        .security_scheme(name)
        .ok_or_else(|| RestkitError::AuthConfiguration {
            scheme: name.clone(),
            reason: "no such entry in components.securitySchemes".to_string(),
        })?;
    serde_json::from_value(raw.clone())
        .map(Some)
        .map_err(|e| RestkitError::AuthConfiguration {
            scheme: name.clone(),
            reason: e.to_string(),
        })
}

fn validate_credential(scheme: Option<&AuthScheme>, credential: &AuthCredential) -> RestkitResult<()> {
    let Some(oauth2) = credential.as_oauth2() else {
        return Ok(());
    };
    if oauth2.has_access_token() || oauth2.has_client_credentials() {
        return Ok(());
    }
    Err(RestkitError::AuthConfiguration {
        scheme: scheme.map_or("oauth2", scheme_kind).to_string(),
        reason: "OAuth2 credential needs an access token or a client id and secret".to_string(),
    })
}

fn build_runtime(options: &ToolsetOptions) -> RestkitResult<ToolRuntime> {
    let http_client = match &options.http_client {
        Some(client) => client.clone(),
        None => reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| RestkitError::Internal {
                component: "http_client".to_string(),
                reason: e.to_string(),
            })?,
    };

    for name in options.default_headers.keys() {
        if name.eq_ignore_ascii_case("user-agent") {
            warn!(header = %name, "default User-Agent is ignored");
        }
    }

    Ok(ToolRuntime {
        refresher: options.refresher.clone().unwrap_or_else(|| {
            Arc::new(OAuth2Refresher::new().with_http_client(http_client.clone()))
        }),
        exchanger: options
            .exchanger
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultCredentialExchanger)),
        http_client,
        timeout: options.timeout,
        declaration_format: options.declaration_format,
        default_headers: Arc::new(options.default_headers.clone()),
        header_provider: options.header_provider.clone(),
    })
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl BaseToolset for OpenApiToolSet {
    async fn get_tools(&self) -> Vec<Arc<dyn BaseTool>> {
        self.tools
            .iter()
            .map(|t| t.clone() as Arc<dyn BaseTool>)
            .collect()
    }

    async fn close(&self) {}
}

impl std::fmt::Debug for OpenApiToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiToolSet")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("tools_count", &self.tools.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::auth::OAuth2Credential;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: Users, version: "1"}
servers: [{url: "https://api.example.com"}]
components:
  securitySchemes:
    apiKey: {type: apiKey, in: header, name: X-API-Key}
paths:
  /users/{user_id}:
    get:
      operationId: getUser
      parameters:
        - {name: user_id, in: path, required: true, schema: {type: string}}
        - {name: X-API-Key, in: header, schema: {type: string}}
      responses:
        "200": {description: ok}
  /health:
    get:
      responses:
        "200": {description: ok}
"#;

    #[test]
    fn builds_one_tool_per_operation() {
        let toolset = OpenApiToolSet::from_str("users", DOC, ToolsetOptions::default()).unwrap();
        let names: Vec<&str> = toolset.tools().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["get_user", "get_health"]);
        assert!(toolset.get_tool("get_user").is_some());
        assert!(toolset.get_tool("missing").is_none());
    }

    #[test]
    fn named_scheme_applies_to_every_operation() {
        let options = ToolsetOptions::default()
            .with_auth_scheme_name("apiKey")
            .with_auth_credential(AuthCredential::api_key("secret"));
        let toolset = OpenApiToolSet::from_str("users", DOC, options).unwrap();

        for tool in toolset.tools() {
            assert!(tool.operation().auth_scheme.is_some());
            assert!(tool.operation().auth_credential.is_some());
        }
        let get_user = toolset.get_tool("get_user").unwrap();
        assert_eq!(get_user.operation().parameters.len(), 1);
    }

    #[test]
    fn unknown_scheme_name_is_rejected() {
        let options = ToolsetOptions::default().with_auth_scheme_name("nope");
        let err = OpenApiToolSet::from_str("users", DOC, options).unwrap_err();
        assert!(matches!(err, RestkitError::AuthConfiguration { .. }));
    }

    #[test]
    fn empty_oauth2_credential_is_rejected() {
        let options = ToolsetOptions::default()
            .with_auth_credential(AuthCredential::OAuth2(OAuth2Credential::default()));
        let err = OpenApiToolSet::from_str("users", DOC, options).unwrap_err();
        assert!(matches!(err, RestkitError::AuthConfiguration { .. }));
    }

    #[test]
    fn base_url_override_wins() {
        let options = ToolsetOptions::default().with_base_url("http://127.0.0.1:9000");
        let toolset = OpenApiToolSet::from_str("users", DOC, options).unwrap();
        assert_eq!(
            toolset.tools()[0].operation().endpoint.base_url,
            "http://127.0.0.1:9000"
        );
    }

    #[tokio::test]
    async fn exposes_tools_through_base_toolset() {
        let toolset = OpenApiToolSet::from_str("users", DOC, ToolsetOptions::default()).unwrap();
        assert_eq!(toolset.get_tools().await.len(), 2);
    }
}
