use serde::Serialize;
use serde_json::{Map, Value};

use super::tool::ToolResult;

/// What a step produced once it was attempted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    Tool(ToolResult),
    Reasoning { note: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub ordinal: u32,
    pub description: String,
    pub tool_name: Option<String>,
    pub tool_arguments: Option<Map<String, Value>>,
    pub outcome: Option<StepOutcome>,
    pub completed: bool,
    pub error: Option<String>,
}

impl AgentStep {
    /// A step that calls a tool. Arguments are always present, possibly empty.
    pub fn tool<D, N>(ordinal: u32, description: D, tool_name: N, arguments: Map<String, Value>) -> Self
    where
        D: Into<String>,
        N: Into<String>,
    {
        Self {
            ordinal,
            description: description.into(),
            tool_name: Some(tool_name.into()),
            tool_arguments: Some(arguments),
            outcome: None,
            completed: false,
            error: None,
        }
    }

    pub fn reasoning<D: Into<String>>(ordinal: u32, description: D) -> Self {
        Self {
            ordinal,
            description: description.into(),
            tool_name: None,
            tool_arguments: None,
            outcome: None,
            completed: false,
            error: None,
        }
    }

    pub fn tool_result(&self) -> Option<&ToolResult> {
        match &self.outcome {
            Some(StepOutcome::Tool(result)) => Some(result),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.completed && self.error.is_none()
    }
}

/// One request's plan together with the outcome of each step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentWorkflow {
    pub request: String,
    pub steps: Vec<AgentStep>,
    pub current_step: usize,
    pub completed: bool,
    pub final_response: Option<String>,
}

impl AgentWorkflow {
    pub fn new<S: Into<String>>(request: S, steps: Vec<AgentStep>) -> Self {
        Self {
            request: request.into(),
            steps,
            current_step: 0,
            completed: false,
            final_response: None,
        }
    }

    pub fn tools_used(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| step.tool_name.clone())
            .collect()
    }

    pub fn successful_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.succeeded()).count()
    }

    /// True when every step was attempted and none of them recorded an error
    pub fn succeeded(&self) -> bool {
        self.completed && self.steps.iter().all(|step| step.error.is_none())
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(AgentStep::tool_result)
            .map(|result| result.execution_time.as_millis() as u64)
            .sum()
    }
}
