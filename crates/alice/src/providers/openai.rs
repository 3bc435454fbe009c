use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ChatResponse, Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{handle_response, messages_to_openai_spec, text_or_empty, token_count};
use crate::models::message::ChatMessage;

pub const OPENAI_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(OPENAI_TIMEOUT).build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        Usage::new(
            token_count(usage, "prompt_tokens"),
            token_count(usage, "completion_tokens"),
            token_count(usage, "total_tokens"),
        )
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("{} API error: {}", self.config.kind, error));
        }

        let message = response
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| anyhow!("Invalid response format from {}", self.config.kind))?;

        Ok(ChatResponse {
            content: text_or_empty(message.get("content")),
            model: self.config.model.clone(),
            provider: self.config.kind,
            usage: Self::get_usage(&response),
        })
    }
}
