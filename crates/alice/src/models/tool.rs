use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt::Debug;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::errors::AgentError;

/// JSON-Schema primitive types a tool parameter can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub description: Option<String>,
}

impl ParameterSpec {
    pub fn required<N: Into<String>, D: Into<String>>(
        name: N,
        kind: ParameterKind,
        description: D,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: Some(description.into()),
        }
    }

    pub fn optional<N: Into<String>, D: Into<String>>(
        name: N,
        kind: ParameterKind,
        description: D,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// A capability the planner may invoke: a unique name, a description and typed parameters.
///
/// On the wire this is `{name, description, inputSchema}` where `inputSchema` is a
/// JSON-Schema object; conversion happens through [`Tool::from_input_schema`] and
/// [`Tool::input_schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTool", into = "WireTool")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Build a tool from a JSON-Schema document. Unknown or missing `type`
    /// entries are read as strings; a schema that is not an object yields no parameters.
    pub fn from_input_schema<N, D>(name: N, description: D, schema: &Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, info)| ParameterSpec {
                        name: name.clone(),
                        kind: info
                            .get("type")
                            .and_then(Value::as_str)
                            .and_then(|kind| kind.parse().ok())
                            .unwrap_or(ParameterKind::String),
                        required: required.contains(&name.as_str()),
                        description: info
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            let mut info = json!({ "type": parameter.kind.as_ref() });
            if let Some(description) = &parameter.description {
                info["description"] = json!(description);
            }
            properties.insert(parameter.name.clone(), info);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_parameters().collect::<Vec<_>>(),
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: Value,
}

impl From<WireTool> for Tool {
    fn from(wire: WireTool) -> Self {
        Tool::from_input_schema(wire.name, wire.description, &wire.input_schema)
    }
}

impl From<Tool> for WireTool {
    fn from(tool: Tool) -> Self {
        WireTool {
            input_schema: tool.input_schema(),
            name: tool.name,
            description: tool.description,
        }
    }
}

/// The outcome of invoking one tool. `error` is set exactly when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(rename = "execution_time_ms", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

impl ToolResult {
    pub fn succeeded<S: Into<String>>(tool_name: S, result: Value, execution_time: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            result: Some(result),
            error: None,
            execution_time,
        }
    }

    pub fn failed<S: Into<String>>(tool_name: S, error: &AgentError, execution_time: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            execution_time,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
