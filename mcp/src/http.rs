use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use icora_mcp_runtime::{McpServer, RpcError, Tool, error_response};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

const SERVICE_NAME: &str = "icora-intent-mcp";

pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/", get(service_info).post(mcp_post))
        .route("/mcp", post(mcp_post))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn mcp_post(State(server): State<McpServer>, body: Bytes) -> Response {
    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(error_response(Value::Null, RpcError::parse_error("Parse error"))),
            )
                .into_response();
        }
    };

    let mut responses = server.handle_incoming_message(incoming).await;
    match responses.len() {
        0 => StatusCode::ACCEPTED.into_response(),
        1 => (StatusCode::OK, Json(responses.remove(0))).into_response(),
        _ => (StatusCode::OK, Json(Value::Array(responses))).into_response(),
    }
}

async fn health(State(server): State<McpServer>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "wiremock_url": wiremock_url(&server),
    }))
}

async fn service_info(State(server): State<McpServer>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "MCP server for TMF921 intent management against a WireMock backend",
        "endpoints": {
            "mcp": "POST /mcp",
            "health": "GET /health"
        },
        "wiremock_url": wiremock_url(&server),
        "tools_available": Tool::ALL.len(),
    }))
}

fn wiremock_url(server: &McpServer) -> String {
    server
        .tools()
        .base_url()
        .unwrap_or_else(|| server.tools().defaults().wiremock_url.clone())
}
