use alice::capabilities::builtin::builtin_tools;
use alice::capabilities::transport::LIST_CAPABILITIES;
use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const TOOLS_LIST: &str = "tools/list";
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Answer one request line. Blank lines get no answer.
fn handle_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: Value = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "unreadable request");
            return Some(error_response(Value::Null, PARSE_ERROR, "Parse error"));
        }
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Some(error_response(id, INVALID_REQUEST, "Invalid request"));
    };

    debug!(method, "request");
    match method {
        LIST_CAPABILITIES | TOOLS_LIST => Some(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": builtin_tools() },
        })),
        other => Some(error_response(
            id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {}", other),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("capability provider ready");
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if let Some(response) = handle_line(&line) {
            stdout.write_all(response.to_string().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, exiting");
    Ok(())
}
