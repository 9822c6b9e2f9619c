//! Generic REST tool: one per OpenAPI operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::collector::ParsedOperation;
use super::parser::parameters_declaration_schema;
use super::request::{BuiltRequest, RequestBuilder};
use crate::compat::{MaybeSend, MaybeSync};
use crate::observability::redact_secrets;
use crate::tools::auth::{
    credential_to_param, AuthPreparationState, CredentialExchanger, CredentialRefresher,
    ToolAuthHandler,
};
use crate::tools::tool_context::ToolContext;
use crate::tools::{BaseTool, FunctionDeclaration, ToolResult};

const MAX_LOGGED_BODY: usize = 512;

/// Message carried by a pending result.
pub const PENDING_AUTH_MESSAGE: &str = "Needs your authorization to access your data.";

/// Shape of the parameter schema handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationFormat {
    /// OpenAPI-subset schema with `properties`, `required` and `nullable`.
    #[default]
    Structured,
    /// Plain JSON Schema, plus the response schema when one is declared.
    JsonSchema,
}

/// Computes extra headers from the invocation context.
pub trait HeaderProviderFn:
    Fn(&ToolContext<'_>) -> HashMap<String, String> + MaybeSend + MaybeSync
{
}

impl<T> HeaderProviderFn for T where
    T: Fn(&ToolContext<'_>) -> HashMap<String, String> + MaybeSend + MaybeSync
{
}

pub type HeaderProvider = Arc<dyn HeaderProviderFn>;

/// Collaborators shared by every tool of one toolset.
#[derive(Clone)]
pub struct ToolRuntime {
    pub http_client: reqwest::Client,
    pub timeout: Duration,
    pub declaration_format: DeclarationFormat,
    pub default_headers: Arc<HashMap<String, String>>,
    pub header_provider: Option<HeaderProvider>,
    pub refresher: Arc<dyn CredentialRefresher>,
    pub exchanger: Arc<dyn CredentialExchanger>,
}

pub struct RestApiTool {
    operation: ParsedOperation,
    runtime: ToolRuntime,
    user_agent: String,
}

impl RestApiTool {
    pub fn new(operation: ParsedOperation, runtime: ToolRuntime) -> Self {
        let user_agent = format!(
            "restkit/{} (tool: {})",
            env!("CARGO_PKG_VERSION"),
            operation.name
        );
        Self {
            operation,
            runtime,
            user_agent,
        }
    }

    pub fn operation(&self) -> &ParsedOperation {
        &self.operation
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn failure(&self, detail: impl std::fmt::Display) -> ToolResult {
        ToolResult::error(format!(
            "Tool {} execution failed. Analyze this execution error and your inputs. \
             Retry with adjustments if applicable, but do not retry more than 3 times. {detail}",
            self.operation.name
        ))
    }

    async fn invoke(&self, request: BuiltRequest) -> ToolResult {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self
            .runtime
            .http_client
            .request(request.method.as_reqwest(), &request.url)
            .headers(request.headers)
            .timeout(self.runtime.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body.bytes);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return self.failure(format!("Error: {e}")),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return self.failure(format!("Error: failed to read response body: {e}")),
        };

        if !status.is_success() {
            warn!(
                tool = %self.operation.name,
                status = status.as_u16(),
                body = %redact_secrets(&text, MAX_LOGGED_BODY),
                "request failed"
            );
            return self.failure(format!("Status Code: {}, Error: {text}", status.as_u16()));
        }

        if content_type.contains("json") {
            match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => ToolResult::success(parsed),
                Err(_) => ToolResult::success(json!({ "text": text })),
            }
        } else {
            ToolResult::success(json!({ "text": text }))
        }
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl BaseTool for RestApiTool {
    fn name(&self) -> &str {
        &self.operation.name
    }

    fn description(&self) -> &str {
        &self.operation.description
    }

    fn declaration(&self) -> FunctionDeclaration {
        match self.runtime.declaration_format {
            DeclarationFormat::Structured => FunctionDeclaration::new(
                &self.operation.name,
                &self.operation.description,
                parameters_declaration_schema(&self.operation.parameters),
            ),
            DeclarationFormat::JsonSchema => {
                let declaration = FunctionDeclaration::new(
                    &self.operation.name,
                    &self.operation.description,
                    self.operation.json_schema.clone(),
                );
                match self
                    .operation
                    .return_value
                    .as_ref()
                    .and_then(|returned| returned.schema.as_ref())
                {
                    Some(schema) => declaration.with_response(schema.to_json_schema()),
                    None => declaration,
                }
            }
        }
    }

    #[tracing::instrument(name = "restkit.tool.run", skip_all, fields(tool = %self.operation.name))]
    async fn run_async(&self, args: HashMap<String, Value>, context: &ToolContext<'_>) -> ToolResult {
        let handler = ToolAuthHandler::new(
            context,
            self.operation.auth_scheme.as_ref(),
            self.operation.auth_credential.as_ref(),
            self.runtime.refresher.as_ref(),
            self.runtime.exchanger.as_ref(),
        );
        let prepared = match handler.prepare_auth_credentials().await {
            Ok(prepared) => prepared,
            Err(e) => return e.into(),
        };
        if prepared.state == AuthPreparationState::Pending {
            return ToolResult::pending(PENDING_AUTH_MESSAGE);
        }

        let auth_param = match (&prepared.auth_scheme, &prepared.auth_credential) {
            (Some(scheme), Some(credential)) => match credential_to_param(scheme, credential) {
                Ok(param) => param,
                Err(e) => return e.into(),
            },
            _ => None,
        };

        let mut context_headers = context.request_headers().clone();
        if let Some(provider) = &self.runtime.header_provider {
            context_headers.extend(provider(context));
        }

        let request = RequestBuilder::new(
            &self.operation.endpoint,
            &self.operation.parameters,
            self.operation.request_body.as_ref(),
        )
        .auth_param(auth_param)
        .default_headers(self.runtime.default_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .context_headers(context_headers)
        .user_agent(&self.user_agent)
        .build(&args);

        match request {
            Ok(request) => self.invoke(request).await,
            Err(e) => e.into(),
        }
    }
}
