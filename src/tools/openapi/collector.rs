//! Walks `paths` and emits one [`ParsedOperation`] per (path, method).

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::naming::{dedupe_names, synthesize_operation_id, to_function_name};
use super::parser::{
    first_scheme_name, parameters_json_schema, ApiParameter, OperationParser, ParamLocation,
    RequestBodySpec, ReturnValue, SecurityRequirement,
};
use crate::tools::auth::{AuthCredential, AuthScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Path item keys, in the order operations are emitted.
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }

    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Put => reqwest::Method::PUT,
            Self::Post => reqwest::Method::POST,
            Self::Delete => reqwest::Method::DELETE,
            Self::Options => reqwest::Method::OPTIONS,
            Self::Head => reqwest::Method::HEAD,
            Self::Patch => reqwest::Method::PATCH,
            Self::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEndpoint {
    pub base_url: String,
    /// Path template, e.g. `/users/{user_id}`.
    pub path: String,
    pub method: HttpMethod,
}

/// Everything needed to build one tool.
#[derive(Debug, Clone)]
pub struct ParsedOperation {
    pub name: String,
    pub description: String,
    pub endpoint: OperationEndpoint,
    /// The operation object with merged path-level parameters.
    pub operation: Value,
    pub parameters: Vec<ApiParameter>,
    pub request_body: Option<RequestBodySpec>,
    pub return_value: Option<ReturnValue>,
    pub json_schema: Value,
    pub auth_scheme_name: Option<String>,
    pub auth_scheme: Option<AuthScheme>,
    pub auth_credential: Option<AuthCredential>,
}

impl ParsedOperation {
    /// Attach the scheme and credential, dropping parameters that the credential supplies.
    pub fn set_auth(&mut self, scheme: Option<AuthScheme>, credential: Option<AuthCredential>) {
        if let Some(scheme) = &scheme {
            self.parameters.retain(|param| !is_auth_parameter(param, scheme));
            self.json_schema = parameters_json_schema(&self.parameters);
        }
        self.auth_scheme = scheme;
        self.auth_credential = credential;
    }
}

fn is_auth_parameter(param: &ApiParameter, scheme: &AuthScheme) -> bool {
    match scheme {
        AuthScheme::APIKey { location, name, .. } => {
            let same_location = matches!(
                (location, param.location),
                (openapiv3::APIKeyLocation::Header, ParamLocation::Header)
                    | (openapiv3::APIKeyLocation::Query, ParamLocation::Query)
                    | (openapiv3::APIKeyLocation::Cookie, ParamLocation::Cookie)
            );
            same_location && param.original_name.eq_ignore_ascii_case(name)
        }
        _ => {
            param.location == ParamLocation::Header
                && param.original_name.eq_ignore_ascii_case("authorization")
        }
    }
}

/// Merge parameter lists keyed by (name, location); later entries replace earlier ones in place.
pub fn merge_parameters(path_level: &[Value], operation_level: &[Value]) -> Vec<Value> {
    let key = |param: &Value| {
        (
            param.get("name").and_then(Value::as_str).map(str::to_string),
            param.get("in").and_then(Value::as_str).map(str::to_string),
        )
    };

    let mut merged: Vec<Value> = Vec::with_capacity(path_level.len() + operation_level.len());
    for param in path_level.iter().chain(operation_level) {
        let param_key = key(param);
        match merged.iter_mut().find(|existing| key(existing) == param_key) {
            Some(slot) => *slot = param.clone(),
            None => merged.push(param.clone()),
        }
    }
    merged
}

pub struct OperationCollector<'a> {
    document: &'a Value,
    base_url: String,
}

impl<'a> OperationCollector<'a> {
    /// `document` must already be resolved and sanitized.
    pub fn new(document: &'a Value, base_url: impl Into<String>) -> Self {
        Self {
            document,
            base_url: base_url.into(),
        }
    }

    pub fn collect(&self) -> Vec<ParsedOperation> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };
        let global_scheme = self
            .document
            .get("security")
            .and_then(Value::as_array)
            .and_then(|requirements| first_scheme_name(requirements));

        let mut operations = Vec::new();
        for (path, item) in paths {
            let path_params: Vec<Value> = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for method in HttpMethod::ALL {
                let Some(raw) = item.get(method.key()).filter(|op| op.is_object()) else {
                    continue;
                };
                operations.push(self.collect_operation(
                    path,
                    method,
                    raw,
                    &path_params,
                    global_scheme.as_deref(),
                ));
            }
        }

        let mut names: Vec<String> = operations.iter().map(|op| op.name.clone()).collect();
        dedupe_names(&mut names);
        for (operation, name) in operations.iter_mut().zip(names) {
            if operation.name != name {
                warn!(original = %operation.name, renamed = %name, "duplicate tool name");
                operation.name = name;
            }
        }

        debug!(count = operations.len(), "collected operations");
        operations
    }

    fn collect_operation(
        &self,
        path: &str,
        method: HttpMethod,
        raw: &Value,
        path_params: &[Value],
        global_scheme: Option<&str>,
    ) -> ParsedOperation {
        let mut operation = raw.clone();
        let op_params: Vec<Value> = raw
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        operation["parameters"] = Value::Array(merge_parameters(path_params, &op_params));

        let operation_id = raw
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .filter(|id| !to_function_name(id).is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| synthesize_operation_id(method.key(), path));

        let signature = OperationParser::parse(&operation, &operation_id);

        let auth_scheme_name = match signature.security {
            SecurityRequirement::Scheme(name) => Some(name),
            SecurityRequirement::Anonymous => None,
            SecurityRequirement::Inherited => global_scheme.map(str::to_string),
        };
        let auth_scheme = auth_scheme_name
            .as_deref()
            .and_then(|name| self.lookup_scheme(name));

        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        let description = text("summary")
            .or_else(|| text("description"))
            .unwrap_or_else(|| format!("{method} {path}"));

        let mut parsed = ParsedOperation {
            name: signature.function_name,
            description,
            endpoint: OperationEndpoint {
                base_url: self.base_url.clone(),
                path: path.to_string(),
                method,
            },
            operation,
            parameters: signature.parameters,
            request_body: signature.request_body,
            return_value: signature.return_value,
            json_schema: signature.json_schema,
            auth_scheme_name,
            auth_scheme: None,
            auth_credential: None,
        };
        parsed.set_auth(auth_scheme, None);
        parsed
    }

    fn lookup_scheme(&self, name: &str) -> Option<AuthScheme> {
        let raw = self
            .document
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(|schemes| schemes.get(name))?;
        match serde_json::from_value::<AuthScheme>(raw.clone()) {
            Ok(scheme) => Some(scheme),
            Err(err) => {
                warn!(scheme = name, error = %err, "ignoring unreadable security scheme");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "openapi": "3.0.0",
            "security": [{"bearerAuth": []}],
            "components": {"securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"},
                "apiKey": {"type": "apiKey", "in": "header", "name": "X-API-Key"}
            }},
            "paths": {
                "/users/{user_id}": {
                    "parameters": [
                        {"name": "user_id", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "verbose", "in": "query", "schema": {"type": "boolean"}, "description": "path level"}
                    ],
                    "get": {
                        "operationId": "getUser",
                        "parameters": [
                            {"name": "verbose", "in": "query", "schema": {"type": "boolean"}, "description": "operation level"}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    },
                    "delete": {
                        "security": [],
                        "responses": {"204": {"description": "gone"}}
                    }
                },
                "/keys": {
                    "post": {
                        "operationId": "createKey",
                        "summary": "Create a key",
                        "security": [{"apiKey": []}],
                        "parameters": [
                            {"name": "X-API-Key", "in": "header", "schema": {"type": "string"}}
                        ],
                        "responses": {"201": {"description": "created"}}
                    }
                }
            }
        })
    }

    #[test]
    fn emits_one_operation_per_path_and_method() {
        let doc = document();
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        let names: Vec<&str> = operations.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["get_user", "delete_users_by_user_id", "create_key"]);
    }

    #[test]
    fn operation_parameters_override_path_parameters() {
        let doc = document();
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        let get_user = &operations[0];
        assert_eq!(get_user.parameters.len(), 2);
        assert_eq!(get_user.parameters[1].description.as_deref(), Some("operation level"));
    }

    #[test]
    fn security_falls_back_to_global_unless_disabled() {
        let doc = document();
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        assert_eq!(operations[0].auth_scheme_name.as_deref(), Some("bearerAuth"));
        assert!(operations[0].auth_scheme.is_some());
        assert!(operations[1].auth_scheme_name.is_none());
        assert_eq!(operations[2].auth_scheme_name.as_deref(), Some("apiKey"));
    }

    #[test]
    fn credential_supplied_parameters_are_hidden() {
        let doc = document();
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        assert!(operations[2].parameters.is_empty());
        assert_eq!(operations[2].description, "Create a key");
    }

    #[test]
    fn missing_summary_falls_back_to_method_and_path() {
        let doc = document();
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        assert_eq!(operations[1].description, "DELETE /users/{user_id}");
    }

    #[test]
    fn colliding_tool_names_are_suffixed() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {
                "/a": {"get": {"operationId": "getPet", "responses": {}}},
                "/b": {"get": {"operationId": "get_pet", "responses": {}}},
                "/pets": {
                    "get": {"responses": {}},
                    "post": {"operationId": "getPets", "responses": {}}
                }
            }
        });
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        let names: Vec<&str> = operations.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["get_pet", "get_pet_0", "get_pets", "get_pets_0"]);
        assert_eq!(operations[1].endpoint.path, "/b");
    }

    #[test]
    fn non_ascii_operation_ids_fall_back_to_method_and_path() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {"/orders/{id}": {"get": {"operationId": "获取", "responses": {}}}}
        });
        let operations = OperationCollector::new(&doc, "https://api.example.com").collect();
        assert_eq!(operations[0].name, "get_orders_by_id");
    }

    #[test]
    fn merge_replaces_in_place() {
        let merged = merge_parameters(
            &[json!({"name": "a", "in": "query", "v": 1}), json!({"name": "b", "in": "query"})],
            &[json!({"name": "a", "in": "query", "v": 2}), json!({"name": "a", "in": "header"})],
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0]["v"], json!(2));
    }
}
