//! Decomposition provider selection.
//!
//! The provider is chosen once at startup from `AI_PROVIDER`, `OPENAI_API_KEY`
//! and `GROQ_API_KEY`. Keys are recognised by prefix (`sk-` for OpenAI,
//! `gsk_` for Groq), so a Groq key pasted into `OPENAI_API_KEY` still works.

use serde::Serialize;

const OPENAI_PLACEHOLDER: &str = "your_openai_api_key_here";
const GROQ_PLACEHOLDER: &str = "your_groq_api_key_here";

/// Known decomposition providers. Both speak the OpenAI chat-completions format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    Groq,
}

impl ProviderKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Groq => "Groq",
        }
    }

    pub fn api_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1/chat/completions",
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-3.5-turbo",
            Self::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Environment variable that holds this provider's key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }

    /// Environment variable that overrides this provider's model.
    pub fn model_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_MODEL",
            Self::Groq => "GROQ_MODEL",
        }
    }

    fn key_prefix(&self) -> &'static str {
        match self {
            Self::OpenAI => "sk-",
            Self::Groq => "gsk_",
        }
    }
}

/// A usable provider: kind, credential, model.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    api_key: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// "Groq (llama-3.3-70b-versatile)"
    pub fn describe(&self) -> String {
        format!("{} ({})", self.kind.display_name(), self.model)
    }
}

// Never print the key.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .finish()
    }
}

/// Outcome of provider resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelection {
    Configured(ProviderConfig),
    /// No usable credentials; the reason names the variable to fix.
    Unconfigured { reason: String },
}

/// Raw provider-related settings as read from the environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    /// `AI_PROVIDER`: "openai", "groq", or anything else for auto-detection.
    pub provider: Option<String>,
    pub openai_key: Option<String>,
    pub groq_key: Option<String>,
    pub openai_model: Option<String>,
    pub groq_model: Option<String>,
}

impl ProviderEnv {
    pub fn from_env() -> Self {
        use crate::util::env_var_trimmed;
        Self {
            provider: env_var_trimmed("AI_PROVIDER"),
            openai_key: env_var_trimmed("OPENAI_API_KEY"),
            groq_key: env_var_trimmed("GROQ_API_KEY"),
            openai_model: env_var_trimmed("OPENAI_MODEL"),
            groq_model: env_var_trimmed("GROQ_MODEL"),
        }
    }
}

fn usable(key: &Option<String>, placeholder: &str) -> Option<String> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty() && *k != placeholder)
        .map(str::to_string)
}

impl ProviderSelection {
    /// Resolve which provider to use.
    pub fn resolve(env: &ProviderEnv) -> Self {
        let openai_key = usable(&env.openai_key, OPENAI_PLACEHOLDER);
        let groq_key = usable(&env.groq_key, GROQ_PLACEHOLDER);
        let requested = env.provider.as_deref().map(|p| p.trim().to_lowercase());

        let (kind, key) = match requested.as_deref() {
            Some("groq") => {
                // A Groq key in OPENAI_API_KEY is accepted here too.
                let key = groq_key.or_else(|| openai_key.filter(|k| k.starts_with("gsk_")));
                (ProviderKind::Groq, key)
            }
            Some("openai") => (ProviderKind::OpenAI, openai_key),
            _ => match Self::auto_detect(openai_key, groq_key) {
                Some(found) => found,
                None => {
                    return Self::Unconfigured {
                        reason: "No AI provider key configured. Set GROQ_API_KEY or OPENAI_API_KEY."
                            .to_string(),
                    }
                }
            },
        };

        let Some(key) = key else {
            return Self::Unconfigured {
                reason: format!(
                    "{} API key is not configured. Set {}.",
                    kind.display_name(),
                    kind.key_var()
                ),
            };
        };

        if !key.starts_with(kind.key_prefix()) {
            return Self::Unconfigured {
                reason: format!(
                    "Invalid {} API key format in {}: expected a key starting with \"{}\".",
                    kind.display_name(),
                    kind.key_var(),
                    kind.key_prefix()
                ),
            };
        }

        let model_override = match kind {
            ProviderKind::OpenAI => env.openai_model.clone(),
            ProviderKind::Groq => env.groq_model.clone(),
        };
        let model = model_override.unwrap_or_else(|| kind.default_model().to_string());
        Self::Configured(ProviderConfig::new(kind, key, model))
    }

    fn auto_detect(
        openai_key: Option<String>,
        groq_key: Option<String>,
    ) -> Option<(ProviderKind, Option<String>)> {
        if let Some(key) = groq_key.as_ref().filter(|k| k.starts_with("gsk_")) {
            return Some((ProviderKind::Groq, Some(key.clone())));
        }
        if let Some(key) = openai_key.as_ref() {
            if key.starts_with("gsk_") {
                tracing::warn!(
                    "Groq API key detected in OPENAI_API_KEY; using Groq. Consider moving it to GROQ_API_KEY."
                );
                return Some((ProviderKind::Groq, Some(key.clone())));
            }
            if key.starts_with("sk-") {
                return Some((ProviderKind::OpenAI, Some(key.clone())));
            }
        }
        if groq_key.is_some() {
            return Some((ProviderKind::Groq, groq_key));
        }
        if openai_key.is_some() {
            return Some((ProviderKind::OpenAI, openai_key));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(provider: Option<&str>, openai: Option<&str>, groq: Option<&str>) -> ProviderEnv {
        ProviderEnv {
            provider: provider.map(String::from),
            openai_key: openai.map(String::from),
            groq_key: groq.map(String::from),
            ..ProviderEnv::default()
        }
    }

    fn configured(selection: ProviderSelection) -> ProviderConfig {
        match selection {
            ProviderSelection::Configured(p) => p,
            other => panic!("expected configured provider, got {:?}", other),
        }
    }

    #[test]
    fn auto_prefers_groq_key() {
        let p = configured(ProviderSelection::resolve(&env(
            None,
            Some("sk-openai"),
            Some("gsk_groq"),
        )));
        assert_eq!(p.kind, ProviderKind::Groq);
        assert_eq!(p.api_key(), "gsk_groq");
        assert_eq!(p.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn auto_moves_misplaced_groq_key() {
        let p = configured(ProviderSelection::resolve(&env(
            Some("auto"),
            Some("gsk_in_wrong_var"),
            None,
        )));
        assert_eq!(p.kind, ProviderKind::Groq);
    }

    #[test]
    fn auto_uses_openai_key() {
        let p = configured(ProviderSelection::resolve(&env(None, Some("sk-abc"), None)));
        assert_eq!(p.kind, ProviderKind::OpenAI);
        assert_eq!(p.model, "gpt-3.5-turbo");
    }

    #[test]
    fn placeholders_count_as_missing() {
        let selection = ProviderSelection::resolve(&env(
            None,
            Some("your_openai_api_key_here"),
            Some("  "),
        ));
        assert!(matches!(selection, ProviderSelection::Unconfigured { .. }));
    }

    #[test]
    fn explicit_provider_requires_matching_prefix() {
        let selection = ProviderSelection::resolve(&env(Some("openai"), Some("gsk_nope"), None));
        match selection {
            ProviderSelection::Unconfigured { reason } => {
                assert!(reason.contains("OPENAI_API_KEY"));
                assert!(!reason.contains("gsk_nope"));
            }
            other => panic!("expected unconfigured, got {:?}", other),
        }
    }

    #[test]
    fn explicit_provider_without_key_is_unconfigured() {
        let selection = ProviderSelection::resolve(&env(Some("GROQ"), None, None));
        match selection {
            ProviderSelection::Unconfigured { reason } => assert!(reason.contains("GROQ_API_KEY")),
            other => panic!("expected unconfigured, got {:?}", other),
        }
    }

    #[test]
    fn model_override_applies() {
        let mut e = env(Some("groq"), None, Some("gsk_x"));
        e.groq_model = Some("llama-3.1-8b-instant".to_string());
        let p = configured(ProviderSelection::resolve(&e));
        assert_eq!(p.model, "llama-3.1-8b-instant");
        assert_eq!(p.describe(), "Groq (llama-3.1-8b-instant)");
    }

    #[test]
    fn debug_output_hides_key() {
        let p = ProviderConfig::new(ProviderKind::OpenAI, "sk-supersecret", "gpt-4o");
        assert!(!format!("{:?}", p).contains("supersecret"));
    }
}
