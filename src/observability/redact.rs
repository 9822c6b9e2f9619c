//! Keeping secrets out of log output.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Short, stable identifier for secret material, safe to log.
pub fn fingerprint(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Replace API keys, tokens, passwords and authorization values with `[REDACTED]`,
/// then truncate to `max_length` bytes.
pub fn redact_secrets(text: &str, max_length: usize) -> String {
    static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
        vec![
            (
                Regex::new(
                    r#"(?i)["']?(api[_-]?key|access[_-]?token|refresh[_-]?token|client[_-]?secret|token|password)["']?\s*[:=]\s*['"]?[^'",}&\s]+['"]?"#,
                )
                .unwrap(),
                "$1: [REDACTED]",
            ),
            (
                Regex::new(r"(?i)(authorization|bearer)\s*:\s*.+").unwrap(),
                "$1: [REDACTED]",
            ),
        ]
    });

    let mut redacted = text.to_string();
    for (re, replacement) in SENSITIVE_PATTERNS.iter() {
        redacted = re.replace_all(&redacted, *replacement).into_owned();
    }

    if redacted.len() > max_length {
        let mut cut = max_length;
        while !redacted.is_char_boundary(cut) {
            cut -= 1;
        }
        redacted = format!("{}...[truncated]", &redacted[..cut]);
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("secret"), fingerprint("secret"));
        assert_ne!(fingerprint("secret"), fingerprint("other"));
        assert_eq!(fingerprint("secret").len(), 16);
    }

    #[test]
    fn test_redacts_json_token_fields() {
        let redacted = redact_secrets(r#"{"access_token": "abc123", "ok": true}"#, 1000);
        assert!(redacted.contains("[REDACTED]"));
        assert!(!redacted.contains("abc123"));
        assert!(redacted.contains("\"ok\": true"));
    }

    #[test]
    fn test_redacts_authorization_header() {
        let redacted = redact_secrets("Authorization: Bearer abc123xyz", 1000);
        assert!(!redacted.contains("abc123xyz"));
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let redacted = redact_secrets(&"é".repeat(100), 51);
        assert!(redacted.ends_with("...[truncated]"));
    }
}
