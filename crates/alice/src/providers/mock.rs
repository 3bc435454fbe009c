use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::base::{ChatResponse, Provider, Usage};
use super::registry::ProviderKind;
use crate::models::message::ChatMessage;

/// A mock provider that returns pre-configured responses for testing.
/// `Err` entries make the matching call fail with that message.
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every reply succeeds with the given text, in order
    pub fn replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Handle on the conversations this provider received
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());

        let mut responses = self.responses.lock().unwrap();
        // Return empty response if no more pre-configured responses
        let next = if responses.is_empty() {
            Ok(String::new())
        } else {
            responses.remove(0)
        };

        let content = next.map_err(|e| anyhow!(e))?;
        Ok(ChatResponse {
            content,
            model: "mock".to_string(),
            provider: ProviderKind::OpenAi,
            usage: Usage::default(),
        })
    }
}
