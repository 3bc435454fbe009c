use chrono::Local;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capabilities::arguments::as_integer;
use crate::capabilities::render_catalog;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::ChatMessage;
use crate::models::tool::Tool;
use crate::models::workflow::{AgentStep, AgentWorkflow};
use crate::prompt_template::{load_prompt, PLAN_PROMPT};
use crate::providers::client::ModelClient;

pub const PLAN_TEMPERATURE: f32 = 0.1;
pub const PLAN_MAX_TOKENS: u32 = 1500;
pub const FALLBACK_STEP: &str = "Process user request with available information";

const PLANNER_SYSTEM: &str = "You are a planning agent that creates structured execution plans.";

/// Turns a request into an ordered plan by asking the model for a step list.
pub struct WorkflowPlanner {
    client: Arc<ModelClient>,
}

impl WorkflowPlanner {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    /// Always returns a workflow with at least one step. Anything that goes wrong
    /// while planning yields the single reasoning step [`FALLBACK_STEP`].
    pub async fn plan(&self, request: &str, catalog: &[Tool]) -> AgentWorkflow {
        match self.try_plan(request, catalog).await {
            Ok(steps) => {
                info!(steps = steps.len(), "planned workflow");
                for step in &steps {
                    debug!(
                        ordinal = step.ordinal,
                        tool = step.tool_name.as_deref().unwrap_or("-"),
                        "{}",
                        step.description
                    );
                }
                AgentWorkflow::new(request, steps)
            }
            Err(e) => {
                warn!(error = %e, "planning failed, using single reasoning step");
                fallback_workflow(request)
            }
        }
    }

    async fn try_plan(&self, request: &str, catalog: &[Tool]) -> AgentResult<Vec<AgentStep>> {
        let prompt = load_prompt(
            PLAN_PROMPT,
            &json!({
                "request": request,
                "today": Local::now().date_naive().to_string(),
                "tools": render_catalog(catalog),
            }),
        )
        .map_err(|e| AgentError::Internal(format!("plan prompt: {}", e)))?;

        let messages = [ChatMessage::system(PLANNER_SYSTEM), ChatMessage::user(prompt)];
        let response = self
            .client
            .chat(&messages, Some(PLAN_TEMPERATURE), Some(PLAN_MAX_TOKENS))
            .await?;

        let steps = parse_plan(&response.content);
        if steps.is_err() {
            debug!(reply = %response.content, "unusable plan reply");
        }
        steps
    }
}

pub fn fallback_workflow(request: &str) -> AgentWorkflow {
    AgentWorkflow::new(request, vec![AgentStep::reasoning(1, FALLBACK_STEP)])
}

/// Read the step list out of a model reply. The reply may wrap the JSON in prose
/// or code fences; either `{"steps": [...]}` or a bare array of steps is accepted.
/// The first JSON span that reads as a valid plan wins, so bracketed fragments in
/// the surrounding prose are skipped.
pub fn parse_plan(reply: &str) -> AgentResult<Vec<AgentStep>> {
    let mut first_error = None;
    for document in json_candidates(reply) {
        match steps_from(&document) {
            Ok(steps) => return Ok(steps),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or_else(|| {
        AgentError::PlanParse("no JSON object or array in reply".to_string())
    }))
}

fn steps_from(document: &Value) -> AgentResult<Vec<AgentStep>> {
    let steps = match document {
        Value::Array(steps) => steps,
        Value::Object(object) => object
            .get("steps")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentError::PlanParse("missing \"steps\" array".to_string()))?,
        _ => return Err(AgentError::PlanParse("plan is not an object or array".to_string())),
    };

    if steps.is_empty() {
        return Err(AgentError::PlanParse("plan has no steps".to_string()));
    }

    steps
        .iter()
        .enumerate()
        .map(|(index, step)| parse_step(index, step))
        .collect()
}

fn parse_step(index: usize, step: &Value) -> AgentResult<AgentStep> {
    let invalid = |reason: &str| AgentError::PlanParse(format!("step {}: {}", index + 1, reason));

    let step = step.as_object().ok_or_else(|| invalid("not an object"))?;

    let ordinal = step
        .get("step_number")
        .and_then(as_integer)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid("step_number must be a positive integer"))?;

    let description = step
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| invalid("description must be a non-empty string"))?;

    let tool_name = match step.get("tool_name") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => {
            let name = name.trim();
            match name.to_ascii_lowercase().as_str() {
                "" | "null" | "none" => None,
                _ => Some(name.to_string()),
            }
        }
        Some(_) => return Err(invalid("tool_name must be a string or null")),
    };

    let Some(tool_name) = tool_name else {
        return Ok(AgentStep::reasoning(ordinal, description));
    };

    let arguments = match step.get("tool_arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(arguments)) => arguments,
            _ => return Err(invalid("tool_arguments string is not a JSON object")),
        },
        Some(_) => return Err(invalid("tool_arguments must be an object")),
    };

    Ok(AgentStep::tool(ordinal, description, tool_name, arguments))
}

/// Every balanced `{...}` or `[...]` span in `text` that parses as JSON, in order
/// of where it starts. Spans nested inside an earlier candidate are yielded too.
/// Brackets inside string literals are ignored while balancing.
pub fn json_candidates(text: &str) -> impl Iterator<Item = Value> + '_ {
    let bytes = text.as_bytes();

    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(**b, b'{' | b'['))
        .filter_map(move |(start, _)| {
            let end = balanced_end(bytes, start)?;
            serde_json::from_str::<Value>(&text[start..=end])
                .ok()
                .filter(|value| value.is_object() || value.is_array())
        })
}

fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
