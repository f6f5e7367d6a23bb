//! Shared utility functions used across the codebase.

use std::sync::OnceLock;

use regex::Regex;

/// Parse an environment variable as a boolean, returning `default` if unset.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// everything else maps to `false`.
pub fn env_var_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Read an environment variable, treating blank values as unset.
pub fn env_var_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secret_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:gsk_|sk-)[A-Za-z0-9_\-*]{4,}").expect("secret pattern is valid")
    })
}

/// Replace anything shaped like an OpenAI (`sk-`) or Groq (`gsk_`) key.
pub fn redact_secrets(text: &str) -> String {
    secret_pattern().replace_all(text, "[redacted]").into_owned()
}

/// Truncate to at most `max_chars` characters, on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on ", "y"] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "off", "", "maybe"] {
            assert!(!parse_bool(value), "{value}");
        }
    }

    #[test]
    fn redact_secrets_hides_keys() {
        let text = "key sk-proj-abc123XYZ and gsk_0123456789abcdef rejected";
        let redacted = redact_secrets(text);
        assert_eq!(redacted, "key [redacted] and [redacted] rejected");
    }

    #[test]
    fn redact_secrets_leaves_prose_alone() {
        let text = "Ask-me-anything tasks are fine";
        assert_eq!(redact_secrets(text), text);
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
