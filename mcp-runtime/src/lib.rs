use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

mod token;
mod tools;
mod util;

#[cfg(test)]
mod test_support;

pub use token::TokenManager;
pub use tools::{AuthDefaults, DEFAULT_WIREMOCK_URL, Tool, ToolContext};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "icora-mcp";

const INSTRUCTIONS: &str = "Configure the backend with icoraintent_configure_auth (defaults come from the server environment), verify it with icoraintent_test_auth or check_connectivity, then create TMF921 intents with icoraintent_create_intent. list_tools shows every available tool.";

/// JSON-RPC front end for the intent tools. Cheap to clone; clones share one
/// [`ToolContext`].
#[derive(Clone)]
pub struct McpServer {
    tools: Arc<ToolContext>,
}

impl McpServer {
    pub fn new(tools: Arc<ToolContext>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolContext {
        &self.tools
    }

    /// Serve `Content-Length` framed JSON-RPC on stdin/stdout until EOF.
    pub async fn serve_stdio(&self) -> Result<(), String> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(&mut reader, &mut stdout).await
    }

    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let wiremock_url = self
            .tools
            .base_url()
            .unwrap_or_else(|| "<not configured>".to_string());
        tracing::info!(
            event = "mcp_server_started",
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            wiremock_url = %wiremock_url,
            "MCP server listening on stdio"
        );

        loop {
            let frame = read_frame(reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(frame) = frame else {
                break;
            };

            let responses = match serde_json::from_slice::<Value>(&frame) {
                Ok(incoming) => self.handle_incoming_message(incoming).await,
                Err(e) => {
                    tracing::warn!(
                        event = "mcp_parse_error",
                        error = %e,
                        "Discarding malformed MCP frame"
                    );
                    vec![error_response(
                        Value::Null,
                        RpcError::parse_error(format!("Parse error: {e}")),
                    )]
                }
            };
            for response in responses {
                write_framed_json(writer, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }
        Ok(())
    }

    /// Handle one decoded message or batch and return every response it produces.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        // No method means a client response; this server never sends requests.
        let method = obj.get("method").and_then(Value::as_str)?;

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let id = obj.get("id").cloned()?;
        Some(match self.handle_request(method, params).await {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let result = match Tool::from_name(name) {
            Some(tool) => {
                tracing::info!(event = "tool_call", tool = name, "Dispatching tool call");
                self.tools.dispatch(tool, &args).await
            }
            None => icora_core::tool::ToolResult::error(format!("Unknown tool: {name}")),
        };

        let structured = serde_json::to_value(&result)
            .map_err(|e| RpcError::internal(format!("Failed to encode tool result: {e}")))?;
        Ok(json!({
            "content": [{ "type": "text", "text": result.text() }],
            "isError": !result.is_success(),
            "structuredContent": structured
        }))
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": INSTRUCTIONS
    })
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = Tool::ALL
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "inputSchema": tool.input_schema(),
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

/// Read one `Content-Length` framed body. The body is returned undecoded so a
/// malformed payload can be answered instead of ending the session.
async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        if line == "\r\n" || line == "\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

async fn write_framed_json<W>(writer: &mut W, value: &Value) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, spawn_backend};

    fn server() -> McpServer {
        McpServer::new(Arc::new(ToolContext::new(AuthDefaults::default())))
    }

    async fn call(server: &McpServer, request: Value) -> Value {
        let mut responses = server.handle_incoming_message(request).await;
        assert_eq!(responses.len(), 1);
        responses.remove(0)
    }

    fn frame(value: &Value) -> Vec<u8> {
        let body = serde_json::to_vec(value).unwrap();
        let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        framed.extend(body);
        framed
    }

    async fn next_reply(replies: &mut BufReader<&[u8]>) -> Option<Value> {
        let body = read_frame(replies).await.unwrap()?;
        Some(serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn initialize_advertises_server_info() {
        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
        )
        .await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "icora-mcp");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_exposes_six_tools_with_schemas() {
        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" }),
        )
        .await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        let create = tools
            .iter()
            .find(|t| t["name"] == "icoraintent_create_intent")
            .unwrap();
        assert_eq!(create["inputSchema"]["required"], json!(["name", "description"]));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 7, "method": "sampling/createMessage" }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn invalid_envelopes_are_rejected() {
        let server = server();
        let response = call(&server, json!({ "jsonrpc": "1.0", "id": 2, "method": "ping" })).await;
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 2);

        let response = call(&server, json!([])).await;
        assert_eq!(response["error"]["code"], -32600);

        let response = call(&server, json!("ping")).await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn notifications_and_client_responses_get_no_reply() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await;
        assert!(responses.is_empty());

        let responses = server
            .handle_incoming_message(json!({ "jsonrpc": "2.0", "id": 4, "result": {} }))
            .await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn batches_answer_each_request() {
        let responses = server()
            .handle_incoming_message(json!([
                { "jsonrpc": "2.0", "id": 1, "method": "ping" },
                { "jsonrpc": "2.0", "method": "notifications/initialized" },
                { "jsonrpc": "2.0", "id": 2, "method": "prompts/list" }
            ]))
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1]["result"]["prompts"], json!([]));
    }

    #[tokio::test]
    async fn tools_call_wraps_result_envelope() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "icoraintent_test_auth" }
            }),
        )
        .await;
        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["status"], "error");
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("not configured")
        );
    }

    #[tokio::test]
    async fn tools_call_reports_unknown_tool_and_bad_arguments() {
        let server = server();
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": { "name": "icoraintent_delete_intent" }
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert!(
            response["result"]["structuredContent"]["errorMessage"]
                .as_str()
                .unwrap()
                .contains("Unknown tool")
        );

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": { "name": "list_tools", "arguments": [1, 2] }
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn configure_then_create_intent_over_jsonrpc() {
        let backend = spawn_backend(MockBackend::default()).await;
        let server = server();

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {
                    "name": "icoraintent_configure_auth",
                    "arguments": { "wiremockUrl": backend.base_url }
                }
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], false);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {
                    "name": "icoraintent_create_intent",
                    "arguments": { "name": "Concert", "description": "Live event" }
                }
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], false);
        assert_eq!(response["result"]["structuredContent"]["status"], "success");
    }

    #[tokio::test]
    async fn stdio_loop_answers_framed_requests() {
        let mut input = frame(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }));
        input.extend(frame(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })));
        input.extend(frame(&json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" })));

        let mut reader = BufReader::new(input.as_slice());
        let mut output: Vec<u8> = Vec::new();
        server().serve(&mut reader, &mut output).await.unwrap();

        let mut replies = BufReader::new(output.as_slice());
        let first = next_reply(&mut replies).await.unwrap();
        let second = next_reply(&mut replies).await.unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert!(next_reply(&mut replies).await.is_none());
    }

    #[tokio::test]
    async fn malformed_frame_gets_parse_error_and_session_continues() {
        let mut input = b"Content-Length: 9\r\n\r\n{not json".to_vec();
        input.extend(frame(&json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" })));

        let mut reader = BufReader::new(input.as_slice());
        let mut output: Vec<u8> = Vec::new();
        server().serve(&mut reader, &mut output).await.unwrap();

        let mut replies = BufReader::new(output.as_slice());
        let first = next_reply(&mut replies).await.unwrap();
        assert_eq!(first["id"], Value::Null);
        assert_eq!(first["error"]["code"], -32700);
        let second = next_reply(&mut replies).await.unwrap();
        assert_eq!(second["id"], 7);
        assert_eq!(second["result"], json!({}));
        assert!(next_reply(&mut replies).await.is_none());
    }

    #[tokio::test]
    async fn framing_rejects_missing_content_length() {
        let mut reader = BufReader::new(&b"Content-Type: application/json\r\n\r\n{}"[..]);
        let err = read_frame(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
