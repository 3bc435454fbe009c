use super::{
    anthropic::AnthropicProvider,
    base::Provider,
    configs::{AnthropicProviderConfig, OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig},
    ollama::OllamaProvider,
    openai::OpenAiProvider,
    registry::{ModelConfig, ProviderKind},
};
use crate::credentials::{resolve_credential, Environment};
use crate::errors::{AgentError, AgentResult};
use anyhow::Result;

/// Resolve the credential a model needs and build the adapter configuration for it
pub fn provider_config(model: &ModelConfig, env: &dyn Environment) -> AgentResult<ProviderConfig> {
    let host = model.host().to_string();
    let api_key = || -> AgentResult<String> {
        let var_name = model.api_key_env.as_deref().ok_or_else(|| {
            AgentError::ModelUnavailable(format!(
                "{} has no credential variable configured",
                model.model_name
            ))
        })?;
        resolve_credential(var_name, env).map_err(|e| AgentError::ModelUnavailable(e.to_string()))
    };

    Ok(match model.provider {
        ProviderKind::Groq | ProviderKind::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig {
            host,
            api_key: api_key()?,
            model: model.model_name.clone(),
            kind: model.provider,
        }),
        ProviderKind::Anthropic => ProviderConfig::Anthropic(AnthropicProviderConfig {
            host,
            api_key: api_key()?,
            model: model.model_name.clone(),
        }),
        ProviderKind::Ollama => ProviderConfig::Ollama(OllamaProviderConfig {
            host,
            model: model.model_name.clone(),
        }),
    })
}

pub async fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Ollama(ollama_config) => {
            Ok(Box::new(OllamaProvider::connect(ollama_config).await?))
        }
    }
}
