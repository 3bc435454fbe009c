use tracing::{debug, info};

use super::base::{ChatResponse, Provider};
use super::factory::{get_provider, provider_config};
use super::registry::{ModelConfig, ModelRegistry};
use crate::credentials::Environment;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::ChatMessage;

/// A fully constructed connection to one registry model.
///
/// A client is never reconfigured: switching models builds a new one and swaps
/// it in whole, so a request never sees a half-built client.
pub struct ModelClient {
    key: String,
    config: ModelConfig,
    provider: Box<dyn Provider + Send + Sync>,
}

impl ModelClient {
    /// Build the adapter for `key`. Unknown keys fail with [`AgentError::UnknownModel`];
    /// missing credentials or an unreachable local server with [`AgentError::ModelUnavailable`].
    pub async fn connect(
        key: &str,
        registry: &ModelRegistry,
        env: &dyn Environment,
    ) -> AgentResult<Self> {
        let config = registry.get_config(key)?.clone();
        let provider = get_provider(provider_config(&config, env)?)
            .await
            .map_err(|e| AgentError::ModelUnavailable(format!("{}: {}", key, e)))?;

        info!(model = key, provider = %config.provider, "model client ready");
        Ok(Self {
            key: key.to_string(),
            config,
            provider,
        })
    }

    /// Wrap an already constructed provider
    pub fn with_provider<S: Into<String>>(
        key: S,
        config: ModelConfig,
        provider: Box<dyn Provider + Send + Sync>,
    ) -> Self {
        Self {
            key: key.into(),
            config,
            provider,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Send the conversation, using the model's defaults where no override is given
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> AgentResult<ChatResponse> {
        let temperature = temperature.unwrap_or(self.config.temperature);
        let max_tokens = max_tokens.unwrap_or(self.config.max_tokens);
        debug!(model = %self.key, messages = messages.len(), temperature, max_tokens, "chat request");

        self.provider
            .chat(messages, temperature, max_tokens)
            .await
            .map_err(|e| AgentError::ModelUnavailable(format!("{}: {}", self.key, e)))
    }
}
