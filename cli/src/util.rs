use std::time::Duration;

use icora_core::tool::ToolResult;
use serde_json::{Value, json};

/// MCP tool calls can wait on a token request plus an intent request.
pub const MCP_TIMEOUT: Duration = Duration::from_secs(60);

pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("icora-cli/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", to_pretty_json(&err));
    std::process::exit(1);
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Print a tool result as JSON and map it to an exit code.
pub fn print_result(result: &ToolResult) -> i32 {
    let rendered = serde_json::to_value(result)
        .map(|v| to_pretty_json(&v))
        .unwrap_or_else(|_| result.text().to_string());
    if result.is_success() {
        println!("{rendered}");
        0
    } else {
        eprintln!("{rendered}");
        1
    }
}

/// Invoke `tool` on the MCP server at `mcp_url` via JSON-RPC `tools/call`.
pub async fn call_mcp_tool(mcp_url: &str, tool: &str, arguments: Value) -> ToolResult {
    let url = format!("{}/mcp", mcp_url.trim_end_matches('/'));
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {
            "name": tool,
            "arguments": arguments
        }
    });
    tracing::debug!(tool, url = %url, "Calling MCP tool");

    let resp = match client()
        .post(&url)
        .json(&request)
        .timeout(MCP_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return ToolResult::error(format!("Error calling MCP function: {e}")),
    };

    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    parse_tool_response(status, &body)
}

/// Interpret an MCP HTTP response as a tool result.
pub fn parse_tool_response(status: u16, body: &str) -> ToolResult {
    if status != 200 {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
        return ToolResult::error(format!("HTTP {status}: {preview}"));
    }

    let payload: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return ToolResult::error(format!("Invalid MCP response: {e}")),
    };

    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return ToolResult::error(format!("MCP Error: {message}"));
    }

    let Some(result) = payload.get("result") else {
        return ToolResult::error("Invalid MCP response: missing result");
    };
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str);
    let Some(text) = text else {
        return ToolResult::error("Invalid MCP response: no text content");
    };

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        ToolResult::error(text)
    } else {
        ToolResult::success(text)
    }
}
