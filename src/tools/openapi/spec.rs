//! OpenAPI document loading and validation.
//!
//! Documents are kept as raw JSON values: `$ref` resolution and type
//! sanitization run before anything is narrowed into typed structures, so a
//! permissive or partly invalid schema never fails parsing outright.
//! Files are loaded with strict extension-based format detection.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::collector::{HttpMethod, OperationCollector, ParsedOperation};
use super::resolver::SpecResolver;
use super::sanitizer::SchemaSanitizer;
use crate::errors::{RestkitError, RestkitResult};
use crate::poll::{poll_until, PollConfig};

const DEFAULT_BASE_URL: &str = "http://localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Unknown,
}

/// A loaded, validated OpenAPI 3.x document plus the base URL calls go to.
#[derive(Debug, Clone)]
pub struct OpenApiSpec {
    document: Value,
    base_url: String,
    source: String,
}

impl OpenApiSpec {
    /// Load a document from disk.
    ///
    /// The extension decides the format: `.json` must hold JSON, `.yaml` or
    /// `.yml` must hold YAML. Anything else is rejected.
    ///
    /// ```no_run
    /// use restkit::tools::openapi::OpenApiSpec;
    ///
    /// let spec = OpenApiSpec::from_file("specs/petstore.yaml").unwrap();
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> RestkitResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RestkitError::spec_load(&source, format!("failed to read file: {e}")))?;

        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Format::Json,
            Some("yaml" | "yml") => Format::Yaml,
            Some(ext) => {
                return Err(RestkitError::spec_load(
                    &source,
                    format!("unsupported extension '.{ext}', expected .json, .yaml or .yml"),
                ));
            }
            None => {
                return Err(RestkitError::spec_load(
                    &source,
                    "no file extension, expected .json, .yaml or .yml",
                ));
            }
        };

        let document = parse_document(&content, format, &source)?;
        Self::from_parts(document, None, source)
    }

    /// Fetch a document over HTTP, picking the format from `Content-Type` or the URL.
    pub async fn from_url(url: &str) -> RestkitResult<Self> {
        Self::from_url_with_client(&reqwest::Client::new(), url).await
    }

    pub async fn from_url_with_client(client: &reqwest::Client, url: &str) -> RestkitResult<Self> {
        match fetch(client, url, false).await? {
            Some(spec) => Ok(spec),
            None => Err(RestkitError::spec_load(url, "document is not available")),
        }
    }

    /// Fetch a document that may still be being generated.
    ///
    /// `202 Accepted` and `404 Not Found` mean "not yet"; the URL is polled
    /// until the document is served, `poll.timeout` elapses or `cancel` fires.
    pub async fn from_url_when_ready(
        url: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> RestkitResult<Self> {
        let client = reqwest::Client::new();
        poll_until("fetch openapi document", poll, cancel, || fetch(&client, url, true)).await
    }

    /// Parse a document held in memory, trying JSON first and YAML second.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> RestkitResult<Self> {
        let document = parse_document(content, Format::Unknown, "<inline>")?;
        Self::from_parts(document, None, "<inline>".to_string())
    }

    pub fn from_value(document: Value) -> RestkitResult<Self> {
        Self::from_parts(document, None, "<value>".to_string())
    }

    fn from_parts(document: Value, fetched_from: Option<&str>, source: String) -> RestkitResult<Self> {
        validate_document(&document, &source)?;
        let base_url = server_base_url(&document, fetched_from);
        debug!(source = %source, base_url = %base_url, "loaded openapi document");
        Ok(Self {
            document,
            base_url,
            source,
        })
    }

    /// Send calls to `base_url` instead of the document's first server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Where the document came from (path, URL or `<inline>`).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn title(&self) -> Option<&str> {
        self.document.pointer("/info/title").and_then(Value::as_str)
    }

    /// The raw security scheme object registered under `name`.
    pub fn security_scheme(&self, name: &str) -> Option<&Value> {
        self.document
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(|schemes| schemes.get(name))
    }

    /// Resolve, sanitize and collect every operation in the document.
    pub fn operations(&self) -> RestkitResult<Vec<ParsedOperation>> {
        let mut resolved = SpecResolver::new(&self.document).resolve()?;
        SchemaSanitizer::sanitize(&mut resolved);
        let operations = OperationCollector::new(&resolved, self.base_url.clone()).collect();
        info!(
            source = %self.source,
            operations = operations.len(),
            "compiled openapi document"
        );
        Ok(operations)
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    allow_pending: bool,
) -> RestkitResult<Option<OpenApiSpec>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RestkitError::spec_load(url, format!("failed to fetch: {e}")))?;

    let status = response.status();
    if allow_pending
        && (status == reqwest::StatusCode::ACCEPTED || status == reqwest::StatusCode::NOT_FOUND)
    {
        debug!(url, status = status.as_u16(), "openapi document not ready yet");
        return Ok(None);
    }
    if !status.is_success() {
        return Err(RestkitError::spec_load(
            url,
            format!("server answered {}", status.as_u16()),
        ));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    let content = response
        .text()
        .await
        .map_err(|e| RestkitError::spec_load(url, format!("failed to read response: {e}")))?;

    let format = if content_type.contains("json") || url.ends_with(".json") {
        Format::Json
    } else if content_type.contains("yaml") || url.ends_with(".yaml") || url.ends_with(".yml") {
        Format::Yaml
    } else {
        Format::Unknown
    };

    let document = parse_document(&content, format, url)?;
    OpenApiSpec::from_parts(document, Some(url), url.to_string()).map(Some)
}

fn parse_document(content: &str, format: Format, source: &str) -> RestkitResult<Value> {
    match format {
        Format::Json => serde_json::from_str(content)
            .map_err(|e| RestkitError::spec_load(source, format!("invalid JSON: {e}"))),
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(yaml_to_json)
            .map_err(|e| RestkitError::spec_load(source, format!("invalid YAML: {e}"))),
        Format::Unknown => serde_json::from_str(content).or_else(|_| {
            serde_yaml::from_str::<serde_yaml::Value>(content)
                .map(yaml_to_json)
                .map_err(|e| RestkitError::spec_load(source, format!("neither JSON nor YAML: {e}")))
        }),
    }
}

/// YAML allows non-string keys (`200:` under `responses`); JSON keys are always strings.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Fail only on what makes tool generation impossible.
fn validate_document(document: &Value, source: &str) -> RestkitResult<()> {
    let version = document
        .get("openapi")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !version.starts_with("3.") {
        return Err(RestkitError::spec_load(
            source,
            format!("unsupported OpenAPI version '{version}', only 3.x is supported"),
        ));
    }

    let Some(paths) = document
        .get("paths")
        .and_then(Value::as_object)
        .filter(|paths| !paths.is_empty())
    else {
        return Err(RestkitError::spec_load(source, "document has no paths defined"));
    };

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for item in paths.values() {
        for method in HttpMethod::ALL {
            let id = item
                .get(method.key())
                .and_then(|op| op.get("operationId"))
                .and_then(Value::as_str);
            if let Some(id) = id {
                if !seen.insert(id) {
                    duplicates.push(id.to_string());
                }
            }
        }
    }
    if !duplicates.is_empty() {
        return Err(RestkitError::spec_load(
            source,
            format!("duplicate operation ids: [{}]", duplicates.join(", ")),
        ));
    }

    Ok(())
}

/// First server URL with `{variable}`s replaced by their defaults.
///
/// Relative server URLs are joined onto the URL the document was fetched from.
fn server_base_url(document: &Value, fetched_from: Option<&str>) -> String {
    let Some(server) = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
    else {
        return fetched_from.unwrap_or(DEFAULT_BASE_URL).to_string();
    };

    let mut url = server
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            if let Some(default) = variable.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return url;
    }

    let anchor = fetched_from.unwrap_or(DEFAULT_BASE_URL);
    url::Url::parse(anchor)
        .and_then(|base| base.join(&url))
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| format!("{}{}", anchor.trim_end_matches('/'), url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "Test API", "version": "1.0.0"},
        "paths": {
            "/test": {"get": {"operationId": "getTest", "responses": {"200": {"description": "OK"}}}}
        }
    }"#;

    #[test]
    fn parses_json_and_defaults_base_url() {
        let spec = OpenApiSpec::from_str(MINIMAL).unwrap();
        assert_eq!(spec.base_url(), "http://localhost");
        assert_eq!(spec.title(), Some("Test API"));
    }

    #[test]
    fn parses_yaml_with_numeric_response_keys() {
        let yaml = "openapi: 3.0.1\ninfo:\n  title: Y\n  version: '1'\npaths:\n  /a:\n    get:\n      responses:\n        200:\n          description: ok\n";
        let spec = OpenApiSpec::from_str(yaml).unwrap();
        let operations = spec.operations().unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].return_value.as_ref().unwrap().status, "200");
    }

    #[test]
    fn rejects_swagger_two() {
        let err = OpenApiSpec::from_value(json!({"swagger": "2.0", "openapi": "2.0", "paths": {"/a": {}}}))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported OpenAPI version"));
    }

    #[test]
    fn rejects_empty_paths() {
        let err = OpenApiSpec::from_value(json!({"openapi": "3.0.0", "paths": {}})).unwrap_err();
        assert!(err.to_string().contains("no paths"));
    }

    #[test]
    fn rejects_duplicate_operation_ids() {
        let err = OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "paths": {
                "/a": {"get": {"operationId": "same"}},
                "/b": {"get": {"operationId": "same"}}
            }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("duplicate operation ids"));
    }

    #[test]
    fn server_variables_use_defaults() {
        let spec = OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "servers": [{
                "url": "https://{region}.example.com/{version}",
                "variables": {"region": {"default": "eu"}, "version": {"default": "v2"}}
            }],
            "paths": {"/a": {"get": {}}}
        }))
        .unwrap();
        assert_eq!(spec.base_url(), "https://eu.example.com/v2");
    }

    #[test]
    fn relative_server_joins_fetch_url() {
        let doc = json!({"servers": [{"url": "/api/v3"}]});
        assert_eq!(
            server_base_url(&doc, Some("https://petstore.example.com/openapi.json")),
            "https://petstore.example.com/api/v3"
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.txt");
        std::fs::write(&path, MINIMAL).unwrap();
        let err = OpenApiSpec::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported extension"));
    }
}
