use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ChatResponse, Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::registry::ProviderKind;
use super::utils::{handle_response, messages_to_openai_spec, text_or_empty, token_count};
use crate::models::message::ChatMessage;

/// Local inference is slow, so chat requests get a generous timeout
pub const OLLAMA_CHAT_TIMEOUT: Duration = Duration::from_secs(300);
pub const OLLAMA_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    /// Build the provider after checking the server answers on `/api/tags`
    pub async fn connect(config: OllamaProviderConfig) -> Result<Self> {
        let url = format!("{}/api/tags", config.host.trim_end_matches('/'));
        let probe = Client::builder().timeout(OLLAMA_PROBE_TIMEOUT).build()?;
        let response = probe
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Cannot connect to Ollama server at {}: {}", config.host, e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Cannot connect to Ollama server at {}: {}",
                config.host,
                response.status()
            ));
        }

        let client = Client::builder().timeout(OLLAMA_CHAT_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        Usage::new(
            token_count(data, "prompt_eval_count"),
            token_count(data, "eval_count"),
            None,
        )
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let response = self.client.post(&url).json(&payload).send().await?;

        handle_response(response).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            }
        });

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("Ollama error: {}", error));
        }

        Ok(ChatResponse {
            content: text_or_empty(response.get("message").and_then(|m| m.get("content"))),
            model: self.config.model.clone(),
            provider: ProviderKind::Ollama,
            usage: Self::get_usage(&response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OLLAMA_MODEL: &str = "llama3";

    async fn _setup_mock_server(response_body: Value) -> (MockServer, OllamaProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "stream": false,
                "options": {"num_predict": 64}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OllamaProviderConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
        };

        let provider = OllamaProvider::connect(config).await.unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_chat_basic() -> Result<()> {
        let response_body = json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "Hello from llama"},
            "done": true,
            "prompt_eval_count": 20,
            "eval_count": 8
        });

        let (_, provider) = _setup_mock_server(response_body).await;
        let response = provider.chat(&[ChatMessage::user("Hello?")], 0.7, 64).await?;

        assert_eq!(response.content, "Hello from llama");
        assert_eq!(response.provider, ProviderKind::Ollama);
        assert_eq!(response.usage.input_tokens, Some(20));
        assert_eq!(response.usage.output_tokens, Some(8));
        assert_eq!(response.usage.total_tokens, Some(28));
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_missing_message() -> Result<()> {
        let (_, provider) = _setup_mock_server(json!({"done": true})).await;
        let response = provider.chat(&[ChatMessage::user("Hello?")], 0.7, 64).await?;

        assert_eq!(response.content, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let result = OllamaProvider::connect(OllamaProviderConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
        })
        .await;

        assert!(result
            .err()
            .unwrap()
            .to_string()
            .contains("Cannot connect to Ollama server"));
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = OllamaProvider::connect(OllamaProviderConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
        })
        .await?;

        let result = provider.chat(&[ChatMessage::user("Hello?")], 0.7, 64).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Server error: 500"));
        Ok(())
    }
}
