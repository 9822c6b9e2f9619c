//! Maps tool arguments onto a concrete HTTP request.

use std::collections::HashMap;
use std::fmt::Write as _;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};
use serde_json::{Map, Value};
use tracing::warn;

use super::collector::{HttpMethod, OperationEndpoint};
use super::parser::{ApiParameter, BodyShape, ParamLocation, RequestBodySpec};
use crate::errors::{RestkitError, RestkitResult};
use crate::tools::auth::AuthParam;

/// Scalar rendering used for path, query, header and cookie values.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Encode a query parameter according to its `style` and `explode` settings.
///
/// Returns several pairs for exploded arrays and deep objects.
fn encode_query_param(
    name: &str,
    value: &Value,
    style: Option<&str>,
    explode: Option<bool>,
) -> Vec<(String, String)> {
    let style = style.unwrap_or("form");
    // OpenAPI: explode defaults to true only for form style.
    let explode = explode.unwrap_or(style == "form");

    match value {
        Value::Array(items) => {
            let values: Vec<String> = items.iter().map(value_to_string).collect();
            match (style, explode) {
                ("form", true) => values.into_iter().map(|v| (name.to_string(), v)).collect(),
                ("spaceDelimited", _) => vec![(name.to_string(), values.join(" "))],
                ("pipeDelimited", _) => vec![(name.to_string(), values.join("|"))],
                _ => vec![(name.to_string(), values.join(","))],
            }
        }
        Value::Object(fields) if style == "deepObject" => fields
            .iter()
            .map(|(key, field)| (format!("{name}[{key}]"), value_to_string(field)))
            .collect(),
        Value::Object(fields) if style == "form" && explode => fields
            .iter()
            .map(|(key, field)| (key.clone(), value_to_string(field)))
            .collect(),
        _ => vec![(name.to_string(), value_to_string(value))],
    }
}

/// Header values: arrays are comma-joined.
fn encode_header_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        _ => value_to_string(value),
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn percent_encode_path_param(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    let _ = write!(&mut encoded, "%{byte:02X}");
                }
            }
        }
    }
    encoded
}

fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub(crate) fn is_json_media_type(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Serialized request payload together with the media type it was encoded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl RequestBody {
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

fn encode_body(media_type: &str, value: &Value) -> RestkitResult<Vec<u8>> {
    let essence = essence(media_type);

    if is_json_media_type(&essence) {
        return Ok(serde_json::to_vec(value)?);
    }

    if essence == "application/x-www-form-urlencoded" {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    form.append_pair(key, &value_to_string(field));
                }
            }
            other => {
                return Err(RestkitError::Serialization {
                    format: "form".to_string(),
                    reason: format!("expected an object body, got {other}"),
                });
            }
        }
        return Ok(form.finish().into_bytes());
    }

    match value {
        Value::String(text) => Ok(text.clone().into_bytes()),
        other if essence.starts_with("text/") => Ok(value_to_string(other).into_bytes()),
        other => Ok(serde_json::to_vec(other)?),
    }
}

/// A fully assembled request, ready to hand to the HTTP client.
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

pub struct RequestBuilder<'a> {
    endpoint: &'a OperationEndpoint,
    parameters: &'a [ApiParameter],
    request_body: Option<&'a RequestBodySpec>,
    auth: Option<AuthParam>,
    default_headers: Vec<(String, String)>,
    context_headers: Vec<(String, String)>,
    user_agent: Option<String>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        endpoint: &'a OperationEndpoint,
        parameters: &'a [ApiParameter],
        request_body: Option<&'a RequestBodySpec>,
    ) -> Self {
        Self {
            endpoint,
            parameters,
            request_body,
            auth: None,
            default_headers: Vec::new(),
            context_headers: Vec::new(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn auth_param(mut self, param: Option<AuthParam>) -> Self {
        self.auth = param;
        self
    }

    /// Toolset-wide headers. Applied after parameter and auth headers.
    #[must_use]
    pub fn default_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Per-invocation headers. Applied after the defaults.
    #[must_use]
    pub fn context_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.context_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Fixed `User-Agent`; always set last and never overridden.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn effective_value<'v>(
        param: &'v ApiParameter,
        args: &'v HashMap<String, Value>,
    ) -> Option<&'v Value> {
        match args.get(&param.safe_name) {
            Some(value) => Some(value),
            None if param.required => param.schema.default_value(),
            None => None,
        }
    }

    pub fn build(self, args: &HashMap<String, Value>) -> RestkitResult<BuiltRequest> {
        let mut path = self.endpoint.path.clone();
        let mut query: Vec<(String, String)> = Vec::new();
        let mut headers = HeaderMap::new();
        let mut cookies: Vec<(String, String)> = Vec::new();
        let mut body_fields = Map::new();
        let mut whole_body: Option<Value> = None;

        for param in self.parameters {
            let Some(value) = Self::effective_value(param, args) else {
                continue;
            };

            match param.location {
                ParamLocation::Path => {
                    if value.is_null() {
                        continue;
                    }
                    let placeholder = format!("{{{}}}", param.original_name);
                    let encoded = percent_encode_path_param(&value_to_string(value));
                    path = path.replace(&placeholder, &encoded);
                }
                ParamLocation::Query => {
                    if !value.is_null() {
                        query.extend(encode_query_param(
                            &param.original_name,
                            value,
                            param.style.as_deref(),
                            param.explode,
                        ));
                    }
                }
                ParamLocation::Header => {
                    if !value.is_null() {
                        insert_header(&mut headers, &param.original_name, &encode_header_value(value));
                    }
                }
                ParamLocation::Cookie => {
                    if !value.is_null() {
                        cookies.push((param.original_name.clone(), value_to_string(value)));
                    }
                }
                ParamLocation::Body => match self.request_body.map(|spec| spec.shape) {
                    Some(BodyShape::Object) => {
                        body_fields.insert(param.original_name.clone(), value.clone());
                    }
                    _ => {
                        if !value.is_null() {
                            whole_body = Some(value.clone());
                        }
                    }
                },
            }
        }

        match self.auth {
            Some(AuthParam::Header { name, value }) => insert_header(&mut headers, &name, &value),
            Some(AuthParam::Query { name, value }) => query.push((name, value)),
            Some(AuthParam::Cookie { name, value }) => cookies.push((name, value)),
            None => {}
        }

        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            insert_header(&mut headers, COOKIE.as_str(), &cookie);
        }

        let body_value = if body_fields.is_empty() {
            whole_body
        } else {
            Some(Value::Object(body_fields))
        };
        let body = match (self.request_body, body_value) {
            (Some(spec), Some(value)) => {
                let bytes = encode_body(&spec.media_type, &value)?;
                insert_header(&mut headers, CONTENT_TYPE.as_str(), &spec.media_type);
                Some(RequestBody {
                    content_type: spec.media_type.clone(),
                    bytes,
                })
            }
            _ => None,
        };

        for (name, value) in self.default_headers.iter().chain(&self.context_headers) {
            if name.eq_ignore_ascii_case(USER_AGENT.as_str()) {
                continue;
            }
            insert_header(&mut headers, name, value);
        }
        if let Some(user_agent) = &self.user_agent {
            insert_header(&mut headers, USER_AGENT.as_str(), user_agent);
        }

        let mut url = format!("{}{}", self.endpoint.base_url.trim_end_matches('/'), path);
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&query)
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }

        Ok(BuiltRequest {
            method: self.endpoint.method,
            url,
            headers,
            body,
        })
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let parsed_name = HeaderName::from_bytes(name.as_bytes());
    let parsed_value = HeaderValue::from_str(value);
    match (parsed_name, parsed_value) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => warn!(header = name, "skipping header with invalid name or value"),
    }
}
