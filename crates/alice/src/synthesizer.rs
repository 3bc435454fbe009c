use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::models::message::ChatMessage;
use crate::models::workflow::{AgentWorkflow, StepOutcome};
use crate::prompt_template::{load_prompt, SYNTHESIS_PROMPT};
use crate::providers::client::ModelClient;

pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;
pub const SYNTHESIS_MAX_TOKENS: u32 = 1000;

const SYNTHESIS_SYSTEM: &str =
    "You are Alice, a helpful AI assistant. Provide clear, detailed responses based on executed actions.";

/// Writes the final answer for an executed workflow. Only looks at what the
/// executor recorded on each step.
pub struct ResponseSynthesizer {
    client: Arc<ModelClient>,
}

impl ResponseSynthesizer {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn synthesize(&self, workflow: &AgentWorkflow) -> String {
        let prompt = match load_prompt(
            SYNTHESIS_PROMPT,
            &json!({
                "request": workflow.request,
                "summary": summarize(workflow),
            }),
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "failed to render synthesis prompt");
                return fallback_response(workflow);
            }
        };

        let messages = [ChatMessage::system(SYNTHESIS_SYSTEM), ChatMessage::user(prompt)];
        match self
            .client
            .chat(&messages, Some(SYNTHESIS_TEMPERATURE), Some(SYNTHESIS_MAX_TOKENS))
            .await
        {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!("model returned an empty answer, using templated summary");
                fallback_response(workflow)
            }
            Err(e) => {
                warn!(error = %e, "answer generation failed, using templated summary");
                fallback_response(workflow)
            }
        }
    }
}

/// One line per step naming the tool and its outcome, with a short gist of the result
pub fn summarize(workflow: &AgentWorkflow) -> String {
    let mut lines = Vec::new();

    for step in &workflow.steps {
        if let Some(error) = &step.error {
            lines.push(format!("Step {}: FAILED - {}", step.ordinal, error));
            continue;
        }

        match &step.outcome {
            Some(StepOutcome::Tool(result)) if result.success => {
                lines.push(format!(
                    "Step {}: Used {} successfully",
                    step.ordinal, result.tool_name
                ));
                match &result.result {
                    Some(Value::Object(object)) => {
                        if let Some(message) = object.get("message").and_then(Value::as_str) {
                            lines.push(format!("  Result: {}", message));
                        }
                    }
                    Some(Value::Array(items)) => {
                        lines.push(format!("  Found {} items", items.len()));
                        for item in items.iter().take(10) {
                            if let Some(gist) = item_gist(item) {
                                lines.push(format!("  - {}", gist));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Some(StepOutcome::Tool(result)) => {
                lines.push(format!("Step {}: {} failed", step.ordinal, result.tool_name));
            }
            Some(StepOutcome::Reasoning { .. }) | None => {
                lines.push(format!("Step {}: {}", step.ordinal, step.description));
            }
        }
    }

    lines.join("\n")
}

fn item_gist(item: &Value) -> Option<String> {
    let label = item
        .get("title")
        .or_else(|| item.get("name"))
        .and_then(Value::as_str)?;

    let mut gist = label.to_string();
    if let Some(class_name) = item.get("class_name").and_then(Value::as_str) {
        gist.push_str(&format!(" ({})", class_name));
    }
    if let Some(due) = item.get("due_date").and_then(Value::as_str) {
        gist.push_str(&format!(", due {}", due));
    }
    if let Some(id) = item.get("id").and_then(Value::as_i64) {
        gist.push_str(&format!(" [id {}]", id));
    }
    Some(gist)
}

/// The templated answer used when the model cannot write one
pub fn fallback_response(workflow: &AgentWorkflow) -> String {
    let done = workflow.successful_steps();
    let total = workflow.steps.len();

    if workflow.succeeded() {
        format!("I've completed your request: completed {} of {} steps.", done, total)
    } else {
        format!(
            "I processed your request and completed {} of {} steps. Some steps ran into problems.",
            done, total
        )
    }
}
