// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

use crate::model::GeneratorKind;

fn default_strategies() -> Vec<GeneratorKind> {
    vec![GeneratorKind::Ai, GeneratorKind::Template]
}
fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_api_key() -> String {
    "ENV".into()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_hashtags() -> Vec<String> {
    ["#MeatIndustry", "#PoultryIndustry", "#PeopleOnTheMove", "#Leadership"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Post drafting: strategy order and the AI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Tried in order for `generate`; `regenerate` always starts with AI.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<GeneratorKind>,
    /// "anthropic" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// "ENV" means: read from ANTHROPIC_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_hashtags")]
    pub hashtags: Vec<String>,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: default_api_key(),
            daily_limit: default_daily_limit(),
            timeout_secs: default_timeout_secs(),
            hashtags: default_hashtags(),
        }
    }
}

impl DraftingConfig {
    /// Normalize provider, drop unknown or repeated strategies, keep at least the template.
    pub fn sanitize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        if self.provider == "claude" {
            self.provider = "anthropic".into();
        }
        let mut seen = Vec::new();
        self.strategies.retain(|k| {
            if seen.contains(k) {
                false
            } else {
                seen.push(*k);
                true
            }
        });
        if self.strategies.is_empty() {
            self.strategies = default_strategies();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "ANTHROPIC_API_KEY",
        }
    }

    /// Resolved key, or `None` when unset (AI drafting then falls back to templates).
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(&self.api_key, self.api_key_env())
    }
}

/// `"ENV"` reads `env_name`; empty means unset; anything else is the literal value.
pub fn resolve_secret(value: &str, env_name: &str) -> Option<String> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("env") {
        env::var(env_name).ok().filter(|s| !s.trim().is_empty())
    } else if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_normalizes_provider_and_strategies() {
        let mut cfg = DraftingConfig {
            provider: " Claude ".into(),
            strategies: vec![GeneratorKind::Template, GeneratorKind::Template],
            ..DraftingConfig::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.provider, "anthropic");
        assert_eq!(cfg.strategies, vec![GeneratorKind::Template]);
        assert_eq!(cfg.api_key_env(), "ANTHROPIC_API_KEY");
    }

    #[serial_test::serial]
    #[test]
    fn env_secret_resolution() {
        env::set_var("POTM_TEST_SECRET", "abc");
        assert_eq!(resolve_secret("ENV", "POTM_TEST_SECRET").as_deref(), Some("abc"));
        env::remove_var("POTM_TEST_SECRET");
        assert_eq!(resolve_secret("env", "POTM_TEST_SECRET"), None);
        assert_eq!(resolve_secret("", "POTM_TEST_SECRET"), None);
        assert_eq!(resolve_secret("literal", "POTM_TEST_SECRET").as_deref(), Some("literal"));
    }
}
