//! Identifier normalization for tool and parameter names.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on generated function names.
pub const MAX_FUNCTION_NAME_LEN: usize = 60;

static LOWER_TO_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static ACRONYM_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

const RESERVED_WORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// `getPetById` -> `get_pet_by_id`, `X-API-Key` -> `x_api_key`.
pub fn to_snake_case(text: &str) -> String {
    let spaced = LOWER_TO_UPPER.replace_all(text, "${1}_${2}");
    let spaced = ACRONYM_BOUNDARY.replace_all(&spaced, "${1}_${2}");
    let joined = NON_ALNUM.replace_all(&spaced, "_");
    joined.trim_matches('_').to_ascii_lowercase()
}

/// A snake_case identifier that is never empty, never starts with a digit and
/// never collides with a reserved word.
pub fn to_safe_identifier(text: &str) -> String {
    let mut name = to_snake_case(text);
    if name.is_empty() {
        return "value".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("param_{name}");
    }
    if RESERVED_WORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

/// snake_case, truncated to [`MAX_FUNCTION_NAME_LEN`] characters.
pub fn to_function_name(text: &str) -> String {
    let name = to_snake_case(text);
    let truncated: String = name.chars().take(MAX_FUNCTION_NAME_LEN).collect();
    truncated.trim_end_matches('_').to_string()
}

/// Name for an operation that declares no `operationId`, e.g.
/// `GET /pets/{petId}` -> `get_pets_by_pet_id`.
pub fn synthesize_operation_id(method: &str, path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
            {
                Some(param) => format!("by_{param}"),
                None => segment.to_string(),
            }
        })
        .collect();

    if segments.is_empty() {
        to_snake_case(&format!("{method}_root"))
    } else {
        to_snake_case(&format!("{method}_{}", segments.join("_")))
    }
}

/// Suffix duplicate names with `_0`, `_1`, ... in order of appearance.
///
/// The first occurrence of a name is kept as-is.
pub fn dedupe_names(names: &mut [String]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in names.iter_mut() {
        let Some(&next) = seen.get(name.as_str()) else {
            seen.insert(name.clone(), 0);
            continue;
        };

        let mut index = next;
        let mut candidate = format!("{name}_{index}");
        while seen.contains_key(&candidate) {
            index += 1;
            candidate = format!("{name}_{index}");
        }
        seen.insert(name.clone(), index + 1);
        seen.insert(candidate.clone(), 0);
        *name = candidate;
    }
}
