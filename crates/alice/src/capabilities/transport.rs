use serde_json::Value;
use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::DiscoveryError;
use crate::models::tool::Tool;

pub const LIST_CAPABILITIES: &str = "list-capabilities";
const LIST_REQUEST: &str = r#"{"jsonrpc":"2.0","id":1,"method":"list-capabilities"}"#;
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// How to launch the live capability provider process
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ProviderCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Start the provider, ask it for its capabilities, read one response line and stop it.
/// Writing the request and waiting for the answer are bounded by the command's timeout.
pub async fn list_capabilities(command: &ProviderCommand) -> Result<Vec<Tool>, DiscoveryError> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(DiscoveryError::Spawn)?;

    let mut stdin = child.stdin.take().ok_or(DiscoveryError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(DiscoveryError::MissingPipe("stdout"))?;

    let exchange = async {
        stdin.write_all(LIST_REQUEST.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;

        let mut lines = BufReader::new(stdout).lines();
        lines.next_line().await?.ok_or(DiscoveryError::Closed)
    };

    let line = tokio::time::timeout(command.timeout, exchange)
        .await
        .map_err(|_| DiscoveryError::Timeout(command.timeout))?;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "capability provider already exited");
    }
    let _ = child.wait().await;

    parse_response(&line?)
}

/// Read `{"result": {"tools": [...]}}`. An error object, a missing or empty tool
/// list and unreadable tool entries all count as malformed.
pub fn parse_response(line: &str) -> Result<Vec<Tool>, DiscoveryError> {
    let response: Value = serde_json::from_str(line.trim())
        .map_err(|e| DiscoveryError::Malformed(format!("invalid JSON: {}", e)))?;

    if let Some(error) = response.get("error") {
        return Err(DiscoveryError::Malformed(format!("provider error: {}", error)));
    }

    let tools = response
        .get("result")
        .and_then(|result| result.get("tools"))
        .cloned()
        .ok_or_else(|| DiscoveryError::Malformed("missing result.tools".to_string()))?;

    let tools: Vec<Tool> = serde_json::from_value(tools)
        .map_err(|e| DiscoveryError::Malformed(format!("invalid tool entry: {}", e)))?;

    if tools.is_empty() {
        return Err(DiscoveryError::Malformed("empty tool list".to_string()));
    }

    let mut seen = HashSet::new();
    Ok(tools
        .into_iter()
        .filter(|tool| {
            let fresh = seen.insert(tool.name.clone());
            if !fresh {
                warn!(tool = %tool.name, "ignoring duplicate capability");
            }
            fresh
        })
        .collect())
}
