use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::HealthResponse;
use crate::state::AppState;

const SERVICE_NAME: &str = "icora-wiremock";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/test", get(test_endpoint))
        .route("/health", get(health_check))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub documentation: String,
    pub endpoints: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub service: String,
    pub framework: String,
}

/// Service info and the list of mocked endpoints
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service info", body = ServiceInfo)),
    tag = "system"
)]
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ready".to_string(),
        documentation: "/docs".to_string(),
        endpoints: [
            "GET /",
            "GET /test",
            "GET /health",
            "GET /__admin/mappings",
            "POST /auth/keycloak_realm/protocol/openid-connect/token",
            "POST /intent/",
            "GET /intent/{intent_id}",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/test",
    responses((status = 200, description = "Mock is running", body = TestResponse)),
    tag = "system"
)]
pub async fn test_endpoint() -> Json<TestResponse> {
    Json(TestResponse {
        status: "success".to_string(),
        message: "icora intent WireMock mock is working".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME.to_string(),
        framework: "axum".to_string(),
    })
}

/// Liveness probe; the mock has no dependencies to check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
