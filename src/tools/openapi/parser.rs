//! Per-operation extraction of parameters, body shape, return value and security.

use serde_json::{json, Map, Value};
use tracing::warn;

use super::naming::{dedupe_names, to_function_name, to_safe_identifier};
use super::schema::SchemaNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParamLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
        }
    }
}

/// One argument of a generated tool and where it lands in the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiParameter {
    pub original_name: String,
    pub location: ParamLocation,
    pub schema: SchemaNode,
    pub description: Option<String>,
    /// Identifier exposed to the model. Unique within one operation.
    pub safe_name: String,
    pub required: bool,
    /// Serialization style (`form`, `spaceDelimited`, `pipeDelimited`, `deepObject`, ...).
    pub style: Option<String>,
    pub explode: Option<bool>,
}

impl ApiParameter {
    pub fn new(
        original_name: impl Into<String>,
        location: ParamLocation,
        schema: SchemaNode,
        description: Option<String>,
        required: bool,
    ) -> Self {
        let original_name = original_name.into();
        Self {
            safe_name: to_safe_identifier(&original_name),
            original_name,
            location,
            schema,
            description,
            required,
            style: None,
            explode: None,
        }
    }

    fn with_description_fallback(mut rendered: Value, description: Option<&str>) -> Value {
        if let (Some(map), Some(description)) = (rendered.as_object_mut(), description) {
            map.entry("description")
                .or_insert_with(|| Value::String(description.to_string()));
        }
        rendered
    }

    pub fn json_schema(&self) -> Value {
        Self::with_description_fallback(self.schema.to_json_schema(), self.description.as_deref())
    }

    pub fn declaration_schema(&self) -> Value {
        Self::with_description_fallback(
            self.schema.to_declaration_schema(),
            self.description.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// One tool argument per property.
    Object,
    /// A single `array` argument carrying the whole body.
    Array,
    /// A single `body` argument carrying the whole body.
    Whole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBodySpec {
    pub media_type: String,
    pub shape: BodyShape,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValue {
    pub status: String,
    pub media_type: Option<String>,
    pub schema: Option<SchemaNode>,
    pub description: Option<String>,
}

/// Operation-level `security` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityRequirement {
    /// No `security` key; the document-level requirement applies.
    Inherited,
    /// `security: []`, or only empty requirement objects.
    Anonymous,
    Scheme(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationSignature {
    pub function_name: String,
    pub parameters: Vec<ApiParameter>,
    pub request_body: Option<RequestBodySpec>,
    pub return_value: Option<ReturnValue>,
    /// JSON Schema object over all parameters, keyed by safe name.
    pub json_schema: Value,
    pub security: SecurityRequirement,
}

/// Name of the first scheme in a list of security requirement objects.
pub fn first_scheme_name(requirements: &[Value]) -> Option<String> {
    requirements
        .iter()
        .filter_map(Value::as_object)
        .find_map(|requirement| requirement.keys().next().cloned())
}

/// JSON Schema describing `parameters` as one object.
pub fn parameters_json_schema(parameters: &[ApiParameter]) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|param| (param.safe_name.clone(), param.json_schema()))
        .collect();
    let required: Vec<&str> = parameters
        .iter()
        .filter(|param| param.required)
        .map(|param| param.safe_name.as_str())
        .collect();
    json!({"type": "object", "properties": properties, "required": required})
}

/// Structured (OpenAPI-subset) shape of the same parameter set.
pub fn parameters_declaration_schema(parameters: &[ApiParameter]) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|param| (param.safe_name.clone(), param.declaration_schema()))
        .collect();
    let mut schema = json!({"type": "object", "properties": properties});
    let required: Vec<&str> = parameters
        .iter()
        .filter(|param| param.required)
        .map(|param| param.safe_name.as_str())
        .collect();
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

pub struct OperationParser;

impl OperationParser {
    /// Parse a resolved, sanitized operation object whose `parameters` already
    /// include the merged path-level entries.
    pub fn parse(operation: &Value, operation_id: &str) -> OperationSignature {
        let mut parameters: Vec<ApiParameter> = operation
            .get("parameters")
            .and_then(Value::as_array)
            .map(|raw| raw.iter().filter_map(parse_parameter).collect())
            .unwrap_or_default();

        let request_body = operation
            .get("requestBody")
            .and_then(|body| parse_request_body(body, operation_id, &mut parameters));

        let mut names: Vec<String> = parameters.iter().map(|p| p.safe_name.clone()).collect();
        dedupe_names(&mut names);
        for (param, name) in parameters.iter_mut().zip(names) {
            param.safe_name = name;
        }

        let return_value = operation.get("responses").and_then(parse_return_value);
        let json_schema = parameters_json_schema(&parameters);

        let security = match operation.get("security") {
            Some(Value::Array(requirements)) => first_scheme_name(requirements)
                .map(SecurityRequirement::Scheme)
                .unwrap_or(SecurityRequirement::Anonymous),
            _ => SecurityRequirement::Inherited,
        };

        OperationSignature {
            function_name: to_function_name(operation_id),
            parameters,
            request_body,
            return_value,
            json_schema,
            security,
        }
    }
}

fn first_media_type(content: &Value) -> Option<(&String, &Value)> {
    content.as_object().and_then(|media| media.iter().next())
}

fn parse_parameter(raw: &Value) -> Option<ApiParameter> {
    let name = raw.get("name").and_then(Value::as_str);
    let location = raw.get("in").and_then(Value::as_str);
    let (Some(name), Some(location)) = (name, location) else {
        warn!(parameter = %raw, "skipping parameter without name or location");
        return None;
    };
    let Some(location) = ParamLocation::parse(location) else {
        warn!(name, location, "skipping parameter with unsupported location");
        return None;
    };

    let schema = raw
        .get("schema")
        .or_else(|| {
            raw.get("content")
                .and_then(first_media_type)
                .and_then(|(_, media)| media.get("schema"))
        })
        .map(SchemaNode::from_value)
        .unwrap_or_else(SchemaNode::any);

    let required = location == ParamLocation::Path
        || raw.get("required").and_then(Value::as_bool).unwrap_or(false);
    let mut param = ApiParameter::new(
        name,
        location,
        schema,
        raw.get("description").and_then(Value::as_str).map(str::to_string),
        required,
    );
    param.style = raw.get("style").and_then(Value::as_str).map(str::to_string);
    param.explode = raw.get("explode").and_then(Value::as_bool);
    Some(param)
}

fn parse_request_body(
    body: &Value,
    operation_id: &str,
    parameters: &mut Vec<ApiParameter>,
) -> Option<RequestBodySpec> {
    let content = body.get("content")?.as_object()?;
    let (media_type, media) = content.iter().next()?;
    if content.len() > 1 {
        warn!(
            operation = operation_id,
            used = %media_type,
            ignored = content.len() - 1,
            "only the first request body media type is used"
        );
    }

    let body_required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let body_description = body.get("description").and_then(Value::as_str);
    let schema = media
        .get("schema")
        .map(SchemaNode::from_value)
        .unwrap_or_else(SchemaNode::any);

    let shape = match &schema {
        SchemaNode::Object {
            properties,
            required,
            ..
        } if !properties.is_empty() => {
            for (name, property) in properties {
                parameters.push(ApiParameter::new(
                    name.clone(),
                    ParamLocation::Body,
                    property.clone(),
                    property.description().map(str::to_string),
                    body_required && required.contains(name),
                ));
            }
            BodyShape::Object
        }
        SchemaNode::Array { .. } => {
            let description = body_description
                .or_else(|| schema.description())
                .map(str::to_string);
            parameters.push(ApiParameter::new(
                "array",
                ParamLocation::Body,
                schema.clone(),
                description,
                body_required,
            ));
            BodyShape::Array
        }
        _ => {
            let description = body_description
                .or_else(|| schema.description())
                .map(str::to_string);
            parameters.push(ApiParameter::new(
                "body",
                ParamLocation::Body,
                schema.clone(),
                description,
                body_required,
            ));
            BodyShape::Whole
        }
    };

    Some(RequestBodySpec {
        media_type: media_type.clone(),
        shape,
        required: body_required,
    })
}

fn parse_return_value(responses: &Value) -> Option<ReturnValue> {
    let responses = responses.as_object()?;
    let (status, response) = responses
        .iter()
        .find(|(code, _)| code.starts_with('2'))
        .map(|(code, response)| (code.as_str(), response))
        .or_else(|| responses.get("default").map(|response| ("default", response)))?;

    let (media_type, schema) = match response.get("content").and_then(first_media_type) {
        Some((media_type, media)) => (
            Some(media_type.clone()),
            media.get("schema").map(SchemaNode::from_value),
        ),
        None => (None, None),
    };

    Some(ReturnValue {
        status: status.to_string(),
        media_type,
        schema,
        description: response
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
