use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ChatResponse, Provider, Usage};
use super::configs::AnthropicProviderConfig;
use super::registry::ProviderKind;
use super::utils::{handle_response, split_system_messages, token_count};
use crate::models::message::ChatMessage;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(ANTHROPIC_TIMEOUT).build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        Usage::new(
            token_count(usage, "input_tokens"),
            token_count(usage, "output_tokens"),
            None,
        )
    }

    /// The first text block of the reply; empty when the model returned no text
    fn first_text_block(data: &Value) -> String {
        data.get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse> {
        let (system, conversation) = split_system_messages(messages);

        let mut payload = json!({
            "model": self.config.model,
            "messages": conversation,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("Anthropic API error: {}", error));
        }

        Ok(ChatResponse {
            content: Self::first_text_block(&response),
            model: self.config.model.clone(),
            provider: ProviderKind::Anthropic,
            usage: Self::get_usage(&response),
        })
    }
}
