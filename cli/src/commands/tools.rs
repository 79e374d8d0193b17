use clap::Args;
use icora_core::tool::ToolResult;
use serde_json::{Map, Value, json};

use crate::util::{STATUS_TIMEOUT, call_mcp_tool, client, exit_error, print_result};

#[derive(Args, Default)]
pub struct ConfigureAuthArgs {
    /// OAuth client id (server default when omitted)
    #[arg(long)]
    pub client_id: Option<String>,
    /// OAuth client secret (server default when omitted)
    #[arg(long)]
    pub client_secret: Option<String>,
    /// Password-grant username (server default when omitted)
    #[arg(long)]
    pub username: Option<String>,
    /// Password-grant password (server default when omitted)
    #[arg(long)]
    pub password: Option<String>,
    /// OAuth scope
    #[arg(long)]
    pub scope: Option<String>,
}

impl ConfigureAuthArgs {
    pub fn to_arguments(&self, wiremock_url: &str) -> Value {
        let mut args = Map::new();
        args.insert("wiremockUrl".to_string(), json!(wiremock_url));
        for (key, value) in [
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("username", &self.username),
            ("password", &self.password),
            ("scope", &self.scope),
        ] {
            if let Some(value) = value {
                args.insert(key.to_string(), json!(value));
            }
        }
        Value::Object(args)
    }
}

#[derive(Args)]
pub struct CallArgs {
    /// Tool name, e.g. `icoraintent_test_auth`
    pub tool: String,
    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

/// Probe the MCP server's health endpoint.
pub async fn check_status(mcp_url: &str) -> ToolResult {
    let url = format!("{}/health", mcp_url.trim_end_matches('/'));
    match client().get(&url).timeout(STATUS_TIMEOUT).send().await {
        Ok(resp) if resp.status().is_success() => {
            ToolResult::success(format!("MCP system is healthy and operational at {mcp_url}"))
        }
        Ok(resp) => ToolResult::error(format!(
            "MCP system responded with status {} at {mcp_url}",
            resp.status().as_u16()
        )),
        Err(e) => ToolResult::error(format!("Cannot connect to MCP system: {e}")),
    }
}

pub async fn status(mcp_url: &str) -> i32 {
    print_result(&check_status(mcp_url).await)
}

pub async fn call(mcp_url: &str, tool: &str, arguments: Value) -> i32 {
    print_result(&call_mcp_tool(mcp_url, tool, arguments).await)
}

pub async fn configure_auth(mcp_url: &str, wiremock_url: &str, args: &ConfigureAuthArgs) -> i32 {
    call(
        mcp_url,
        "icoraintent_configure_auth",
        args.to_arguments(wiremock_url),
    )
    .await
}

pub async fn call_raw(mcp_url: &str, args: CallArgs) -> i32 {
    let arguments: Value = match serde_json::from_str(&args.args) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => exit_error("--args must be a JSON object", Some("Example: --args '{\"name\":\"x\"}'")),
        Err(e) => exit_error(&format!("Invalid JSON in --args: {e}"), None),
    };
    call(mcp_url, &args.tool, arguments).await
}
