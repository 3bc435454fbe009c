use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::credentials::{resolve_credential, Environment};
use crate::errors::{AgentError, AgentResult};

pub const DEFAULT_MODEL: &str = "llama-70b";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn default_host(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    /// Self-hosted providers need no secret and are always reported available
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
}

impl ModelConfig {
    pub fn new<S: Into<String>>(provider: ProviderKind, model_name: S) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key_env: None,
            base_url: None,
        }
    }

    pub fn with_api_key_env<S: Into<String>>(mut self, var_name: S) -> Self {
        self.api_key_env = Some(var_name.into());
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn host(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_host())
    }
}

/// Catalog of the reasoning models the assistant can be pointed at, keyed by a short name
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelConfig>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .with_model(
                "llama-70b",
                ModelConfig::new(ProviderKind::Groq, "llama-3.3-70b-versatile")
                    .with_api_key_env("GROQ_API_KEY"),
            )
            .with_model(
                "llama-8b",
                ModelConfig::new(ProviderKind::Groq, "llama-3.1-8b-instant")
                    .with_api_key_env("GROQ_API_KEY"),
            )
            .with_model(
                "mixtral",
                ModelConfig::new(ProviderKind::Groq, "mixtral-8x7b-32768")
                    .with_api_key_env("GROQ_API_KEY"),
            )
            .with_model(
                "gpt-4",
                ModelConfig::new(ProviderKind::OpenAi, "gpt-4").with_api_key_env("OPENAI_API_KEY"),
            )
            .with_model(
                "gpt-3.5-turbo",
                ModelConfig::new(ProviderKind::OpenAi, "gpt-3.5-turbo")
                    .with_api_key_env("OPENAI_API_KEY"),
            )
            .with_model(
                "claude-3.5-sonnet",
                ModelConfig::new(ProviderKind::Anthropic, "claude-3-5-sonnet-20241022")
                    .with_api_key_env("ANTHROPIC_API_KEY"),
            )
            .with_model(
                "llama3-local",
                ModelConfig::new(ProviderKind::Ollama, "llama3")
                    .with_base_url(ProviderKind::Ollama.default_host()),
            )
    }

    pub fn with_model<S: Into<String>>(mut self, key: S, config: ModelConfig) -> Self {
        self.models.insert(key.into(), config);
        self
    }

    pub fn get_config(&self, key: &str) -> AgentResult<&ModelConfig> {
        self.models.get(key).ok_or_else(|| {
            AgentError::UnknownModel(format!(
                "{}. Available: {}",
                key,
                self.keys().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Key → "provider - model" descriptions, sorted by key
    pub fn list(&self) -> Vec<(String, String)> {
        self.models
            .iter()
            .map(|(key, config)| {
                (
                    key.clone(),
                    format!("{} - {}", config.provider, config.model_name),
                )
            })
            .collect()
    }

    /// A model is available when its credential resolves; local providers always are.
    /// Unknown keys are simply unavailable.
    pub fn is_available(&self, key: &str, env: &dyn Environment) -> bool {
        let Some(config) = self.models.get(key) else {
            return false;
        };
        if config.provider.is_local() {
            return true;
        }
        config
            .api_key_env
            .as_deref()
            .is_some_and(|var_name| resolve_credential(var_name, env).is_ok())
    }

    /// The preferred key if the registry knows it, otherwise [`DEFAULT_MODEL`]
    pub fn default_key(&self, preferred: Option<&str>) -> String {
        match preferred {
            Some(key) if self.contains(key) => key.to_string(),
            _ => DEFAULT_MODEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MockEnvironment;
    use mockall::predicate::*;
    use std::env::VarError;

    #[test]
    fn test_builtin_registry() {
        let registry = ModelRegistry::builtin();
        let keys: Vec<_> = registry.keys().collect();
        assert_eq!(keys.len(), 7);
        assert!(registry.contains("claude-3.5-sonnet"));

        let config = registry.get_config("mixtral").unwrap();
        assert_eq!(config.provider, ProviderKind::Groq);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.host(), "https://api.groq.com/openai");
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::builtin();
        let err = registry.get_config("gpt-17").unwrap_err();
        assert!(matches!(err, AgentError::UnknownModel(ref msg) if msg.starts_with("gpt-17")));
    }

    #[test]
    fn test_list_descriptions() {
        let registry = ModelRegistry::builtin();
        let listed = registry.list();
        assert!(listed.contains(&("gpt-4".to_string(), "openai - gpt-4".to_string())));
        assert!(listed.contains(&("llama3-local".to_string(), "ollama - llama3".to_string())));
    }

    #[test]
    fn test_availability_follows_credentials() {
        let registry = ModelRegistry::builtin();

        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq("OPENAI_API_KEY"))
            .returning(|_| Ok("sk-test".to_string()));
        mock_env
            .expect_get_var()
            .with(eq("GROQ_API_KEY"))
            .returning(|_| Ok("  ".to_string()));
        mock_env
            .expect_get_var()
            .with(eq("ANTHROPIC_API_KEY"))
            .returning(|_| Err(VarError::NotPresent));

        assert!(registry.is_available("gpt-4", &mock_env));
        assert!(!registry.is_available("llama-70b", &mock_env));
        assert!(!registry.is_available("claude-3.5-sonnet", &mock_env));
        assert!(registry.is_available("llama3-local", &mock_env));
        assert!(!registry.is_available("no-such-model", &mock_env));
    }

    #[test]
    fn test_default_key() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.default_key(Some("gpt-4")), "gpt-4");
        assert_eq!(registry.default_key(Some("bogus")), DEFAULT_MODEL);
        assert_eq!(registry.default_key(None), DEFAULT_MODEL);
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
    }
}
