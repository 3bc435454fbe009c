use anyhow::{anyhow, Result};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use crate::models::message::{ChatMessage, Role};

/// Convert chat messages to the OpenAI message specification, which Ollama's
/// native chat endpoint also accepts
pub fn messages_to_openai_spec(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
            })
        })
        .collect()
}

/// Split out system messages, which Anthropic takes as a top-level field
pub fn split_system_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let conversation = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, conversation)
}

/// Map a provider HTTP response to its JSON body, turning error statuses into errors
pub async fn handle_response(response: Response) -> Result<Value> {
    match response.status() {
        status if status.is_success() => Ok(response.json().await?),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("Request failed: {} - {}", status, error_text))
        }
    }
}

/// Read an unsigned token counter from a usage object
pub fn token_count(usage: &Value, field: &str) -> Option<u32> {
    usage
        .get(field)
        .and_then(Value::as_u64)
        .map(|count| count as u32)
}

/// Text content that may be null or missing normalizes to an empty string
pub fn text_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
