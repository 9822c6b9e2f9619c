use serde_json::Value;
use tracing::debug;

const VALID_SCHEMA_TYPES: [&str; 7] = [
    "array", "boolean", "integer", "null", "number", "object", "string",
];

/// Normalizes `type` fields of every node beneath a `schema`/`schemas` key.
///
/// String types are lower-cased and dropped when not a JSON Schema type.
/// Type arrays keep only valid members, deduplicated in order, and are
/// dropped when nothing survives. Other `type` shapes are left alone.
pub struct SchemaSanitizer;

impl SchemaSanitizer {
    pub fn sanitize(document: &mut Value) {
        sanitize_node(document, false);
    }
}

fn sanitize_node(node: &mut Value, in_schema: bool) {
    match node {
        Value::Object(map) => {
            if in_schema {
                let replacement = match map.get("type") {
                    Some(Value::String(type_name)) => Some(normalize_single(type_name)),
                    Some(Value::Array(types)) => Some(normalize_list(types)),
                    _ => None,
                };
                match replacement {
                    Some(Some(value)) => {
                        map.insert("type".to_string(), value);
                    }
                    Some(None) => {
                        debug!(original = ?map.get("type"), "dropping invalid schema type");
                        map.remove("type");
                    }
                    None => {}
                }
            }

            for (key, child) in map.iter_mut() {
                let child_in_schema = in_schema || key == "schema" || key == "schemas";
                sanitize_node(child, child_in_schema);
            }
        }
        Value::Array(items) => {
            for item in items {
                sanitize_node(item, in_schema);
            }
        }
        _ => {}
    }
}

fn normalize_single(type_name: &str) -> Option<Value> {
    let lowered = type_name.to_ascii_lowercase();
    VALID_SCHEMA_TYPES
        .contains(&lowered.as_str())
        .then(|| Value::String(lowered))
}

fn normalize_list(types: &[Value]) -> Option<Value> {
    let mut kept: Vec<Value> = Vec::new();
    for entry in types {
        let Some(type_name) = entry.as_str() else {
            continue;
        };
        let lowered = type_name.to_ascii_lowercase();
        if VALID_SCHEMA_TYPES.contains(&lowered.as_str())
            && !kept.iter().any(|existing| existing.as_str() == Some(lowered.as_str()))
        {
            kept.push(Value::String(lowered));
        }
    }
    (!kept.is_empty()).then_some(Value::Array(kept))
}
