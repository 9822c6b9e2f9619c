//! Closed schema AST.
//!
//! Raw schema objects are narrowed into [`SchemaNode`] as soon as they are
//! read from the document. Everything downstream (parameter extraction,
//! declarations, request building) matches on the AST instead of probing
//! JSON fields.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub nullable: bool,
}

impl SchemaMeta {
    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            title: text("title"),
            description: text("description"),
            default: map.get("default").cloned(),
            example: map.get("example").cloned(),
            nullable: map.get("nullable").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    fn write_to(&self, out: &mut Map<String, Value>) {
        if let Some(title) = &self.title {
            out.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        if let Some(example) = &self.example {
            out.insert("example".into(), example.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// No usable type information.
    Any,
}

impl ScalarKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            _ => Self::Any,
        }
    }

    pub fn type_name(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Null => Some("null"),
            Self::Any => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AllOf,
    AnyOf,
    OneOf,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object {
        /// Properties in document order.
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
        additional_properties: Option<Box<SchemaNode>>,
        meta: SchemaMeta,
    },
    Array {
        items: Option<Box<SchemaNode>>,
        meta: SchemaMeta,
    },
    Scalar {
        kind: ScalarKind,
        format: Option<String>,
        enum_values: Vec<Value>,
        meta: SchemaMeta,
    },
    Composite {
        combinator: Combinator,
        variants: Vec<SchemaNode>,
        meta: SchemaMeta,
    },
    /// A reference that was left in place to break a cycle.
    Unresolved { reference: String, meta: SchemaMeta },
}

impl SchemaNode {
    /// A schema that accepts anything.
    pub fn any() -> Self {
        Self::Scalar {
            kind: ScalarKind::Any,
            format: None,
            enum_values: Vec::new(),
            meta: SchemaMeta::default(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::any();
        };
        let mut meta = SchemaMeta::from_map(map);

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return Self::Unresolved {
                reference: reference.to_string(),
                meta,
            };
        }

        for combinator in [Combinator::AllOf, Combinator::AnyOf, Combinator::OneOf] {
            if let Some(Value::Array(raw_variants)) = map.get(combinator.keyword()) {
                let variants: Vec<SchemaNode> = raw_variants.iter().map(Self::from_value).collect();
                if combinator == Combinator::AllOf {
                    if let Some(merged) = merge_objects(&variants, &meta) {
                        return merged;
                    }
                }
                return Self::Composite {
                    combinator,
                    variants,
                    meta,
                };
            }
        }

        let declared = declared_types(map);
        if declared.contains(&"null") {
            meta.nullable = true;
        }
        let concrete: Vec<&str> = declared.into_iter().filter(|t| *t != "null").collect();

        match concrete.as_slice() {
            [] if meta.nullable && map.contains_key("type") => Self::Scalar {
                kind: ScalarKind::Null,
                format: None,
                enum_values: Vec::new(),
                meta,
            },
            [] if map.contains_key("properties") => Self::typed("object", map, meta),
            [] if map.contains_key("items") => Self::typed("array", map, meta),
            [] => Self::typed("", map, meta),
            [single] => Self::typed(single, map, meta),
            several => Self::Composite {
                combinator: Combinator::AnyOf,
                variants: several
                    .iter()
                    .map(|type_name| Self::typed(type_name, map, SchemaMeta::default()))
                    .collect(),
                meta,
            },
        }
    }

    fn typed(type_name: &str, map: &Map<String, Value>, meta: SchemaMeta) -> Self {
        match type_name {
            "object" => {
                let properties = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, schema)| (name.clone(), Self::from_value(schema)))
                            .collect()
                    })
                    .unwrap_or_default();
                let required = map
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                let additional_properties = map
                    .get("additionalProperties")
                    .filter(|value| value.is_object())
                    .map(|value| Box::new(Self::from_value(value)));
                Self::Object {
                    properties,
                    required,
                    additional_properties,
                    meta,
                }
            }
            "array" => Self::Array {
                items: map.get("items").map(|items| Box::new(Self::from_value(items))),
                meta,
            },
            other => Self::Scalar {
                kind: ScalarKind::from_type_name(other),
                format: map.get("format").and_then(Value::as_str).map(str::to_string),
                enum_values: map
                    .get("enum")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                meta,
            },
        }
    }

    pub fn meta(&self) -> &SchemaMeta {
        match self {
            Self::Object { meta, .. }
            | Self::Array { meta, .. }
            | Self::Scalar { meta, .. }
            | Self::Composite { meta, .. }
            | Self::Unresolved { meta, .. } => meta,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.meta().description.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.meta().default.as_ref()
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Standard JSON Schema rendering. Nullability becomes a `"null"` type member.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        let meta = self.meta();
        let type_value = |name: &str| {
            if meta.nullable && name != "null" {
                json!([name, "null"])
            } else {
                json!(name)
            }
        };

        match self {
            Self::Object {
                properties,
                required,
                additional_properties,
                ..
            } => {
                out.insert("type".into(), type_value("object"));
                if !properties.is_empty() {
                    let rendered: Map<String, Value> = properties
                        .iter()
                        .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                        .collect();
                    out.insert("properties".into(), Value::Object(rendered));
                }
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                if let Some(extra) = additional_properties {
                    out.insert("additionalProperties".into(), extra.to_json_schema());
                }
            }
            Self::Array { items, .. } => {
                out.insert("type".into(), type_value("array"));
                if let Some(items) = items {
                    out.insert("items".into(), items.to_json_schema());
                }
            }
            Self::Scalar {
                kind,
                format,
                enum_values,
                ..
            } => {
                if let Some(name) = kind.type_name() {
                    out.insert("type".into(), type_value(name));
                }
                if let Some(format) = format {
                    out.insert("format".into(), json!(format));
                }
                if !enum_values.is_empty() {
                    out.insert("enum".into(), json!(enum_values));
                }
            }
            Self::Composite {
                combinator,
                variants,
                ..
            } => {
                let mut rendered: Vec<Value> = variants.iter().map(Self::to_json_schema).collect();
                if meta.nullable && *combinator != Combinator::AllOf {
                    rendered.push(json!({"type": "null"}));
                }
                out.insert(combinator.keyword().into(), Value::Array(rendered));
            }
            Self::Unresolved { .. } => {}
        }

        meta.write_to(&mut out);
        Value::Object(out)
    }

    /// OpenAPI-style subset: a single `type` plus `nullable`, `anyOf` for unions.
    pub fn to_declaration_schema(&self) -> Value {
        let mut out = Map::new();
        let meta = self.meta();

        match self {
            Self::Object {
                properties,
                required,
                ..
            } => {
                out.insert("type".into(), json!("object"));
                let rendered: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_declaration_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(rendered));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
            }
            Self::Array { items, .. } => {
                out.insert("type".into(), json!("array"));
                if let Some(items) = items {
                    out.insert("items".into(), items.to_declaration_schema());
                }
            }
            Self::Scalar {
                kind,
                format,
                enum_values,
                ..
            } => {
                if let Some(name) = kind.type_name() {
                    out.insert("type".into(), json!(name));
                }
                if let Some(format) = format {
                    out.insert("format".into(), json!(format));
                }
                if !enum_values.is_empty() {
                    out.insert("enum".into(), json!(enum_values));
                }
            }
            Self::Composite { variants, .. } => {
                let rendered: Vec<Value> = variants.iter().map(Self::to_declaration_schema).collect();
                out.insert("anyOf".into(), Value::Array(rendered));
            }
            Self::Unresolved { .. } => {}
        }

        if meta.nullable {
            out.insert("nullable".into(), json!(true));
        }
        if let Some(description) = &meta.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(default) = &meta.default {
            out.insert("default".into(), default.clone());
        }
        Value::Object(out)
    }
}

fn declared_types(map: &Map<String, Value>) -> Vec<&str> {
    match map.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// `allOf` over object schemas collapses into one object.
fn merge_objects(variants: &[SchemaNode], outer: &SchemaMeta) -> Option<SchemaNode> {
    if variants.is_empty() || !variants.iter().all(SchemaNode::is_object) {
        return None;
    }

    let mut properties: Vec<(String, SchemaNode)> = Vec::new();
    let mut required: Vec<String> = Vec::new();
    let mut meta = outer.clone();
    for variant in variants {
        if let SchemaNode::Object {
            properties: props,
            required: req,
            meta: variant_meta,
            ..
        } = variant
        {
            for (name, schema) in props {
                match properties.iter_mut().find(|(existing, _)| existing == name) {
                    Some(slot) => slot.1 = schema.clone(),
                    None => properties.push((name.clone(), schema.clone())),
                }
            }
            for name in req {
                if !required.contains(name) {
                    required.push(name.clone());
                }
            }
            if meta.description.is_none() {
                meta.description = variant_meta.description.clone();
            }
        }
    }

    Some(SchemaNode::Object {
        properties,
        required,
        additional_properties: None,
        meta,
    })
}
