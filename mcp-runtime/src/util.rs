use std::time::Duration;

use serde_json::{Value, json};

/// Token requests and intent creation.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Health and admin probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("icora-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Read a response body as text without failing the caller.
pub async fn body_text(resp: reqwest::Response) -> String {
    resp.text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

/// Parse a body as JSON, keeping non-JSON text as a string.
pub fn parse_response_body(bytes: &str) -> Value {
    if bytes.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(bytes).unwrap_or_else(|_| json!(bytes))
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
