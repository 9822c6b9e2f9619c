//! Local `$ref` resolution.
//!
//! A [`SpecResolver`] is single-use: it owns the cache of fully resolved
//! targets for one document and is consumed by [`SpecResolver::resolve`].

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{RestkitError, RestkitResult};

pub struct SpecResolver<'doc> {
    root: &'doc Value,
    /// ref -> fully resolved target. Hits are handed out as deep copies.
    resolved_cache: HashMap<String, Value>,
    /// Refs on the current recursion path.
    seen_refs: HashSet<String>,
}

impl<'doc> SpecResolver<'doc> {
    pub fn new(root: &'doc Value) -> Self {
        Self {
            root,
            resolved_cache: HashMap::new(),
            seen_refs: HashSet::new(),
        }
    }

    /// Replace every local `$ref` with its target.
    ///
    /// References on an active cycle are replaced by the referencing node
    /// minus its `$ref` key.
    pub fn resolve(mut self) -> RestkitResult<Value> {
        let root = self.root;
        let resolved = self.resolve_node(root)?;
        debug!(
            references = self.resolved_cache.len(),
            "resolved document references"
        );
        Ok(resolved)
    }

    fn resolve_node(&mut self, node: &'doc Value) -> RestkitResult<Value> {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.resolve_reference(reference, map);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.resolve_node(value)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_node(item))
                .collect::<RestkitResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_reference(
        &mut self,
        reference: &str,
        node: &'doc Map<String, Value>,
    ) -> RestkitResult<Value> {
        if let Some(cached) = self.resolved_cache.get(reference) {
            return Ok(cached.clone());
        }

        if self.seen_refs.contains(reference) {
            debug!(reference, "breaking reference cycle");
            let mut stub = Map::with_capacity(node.len());
            for (key, value) in node.iter().filter(|(key, _)| key.as_str() != "$ref") {
                stub.insert(key.clone(), self.resolve_node(value)?);
            }
            return Ok(Value::Object(stub));
        }

        let target = self.lookup(reference)?;
        self.seen_refs.insert(reference.to_string());
        let resolved = self.resolve_node(target);
        self.seen_refs.remove(reference);
        let resolved = resolved?;

        self.resolved_cache
            .insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn lookup(&self, reference: &str) -> RestkitResult<&'doc Value> {
        let root: &'doc Value = self.root;
        let pointer = match reference.strip_prefix('#') {
            Some(pointer) if pointer.is_empty() || pointer.starts_with('/') => pointer,
            _ => {
                return Err(RestkitError::SpecResolution {
                    reference: reference.to_string(),
                    reason: "only local references starting with '#/' are supported".to_string(),
                })
            }
        };

        root.pointer(pointer)
            .ok_or_else(|| RestkitError::SpecResolution {
                reference: reference.to_string(),
                reason: "reference target not found in document".to_string(),
            })
    }
}

/// True when any object in `value` still carries a `$ref` key.
pub fn contains_reference(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_reference),
        Value::Array(items) => items.iter().any(contains_reference),
        _ => false,
    }
}
