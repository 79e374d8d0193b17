use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod middleware;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "icora intent WireMock API",
        version = "0.1.0",
        description = "Mock TMF921 Intent Management API with a Keycloak-style token endpoint."
    ),
    paths(
        routes::health::service_info,
        routes::health::test_endpoint,
        routes::health::health_check,
        routes::admin::list_mappings,
        routes::oauth::token,
        routes::intent::create_intent,
        routes::intent::get_intent,
    ),
    components(schemas(
        HealthResponse,
        routes::health::ServiceInfo,
        routes::health::TestResponse,
        routes::admin::AdminMapping,
        routes::admin::MappingsMeta,
        routes::admin::AdminMappingsResponse,
        routes::oauth::TokenForm,
        icora_core::auth::OAuthTokenResponse,
        icora_core::error::ApiError,
        icora_core::intent::Expectation,
        icora_core::intent::ValidFor,
        icora_core::intent::IntentSubmission,
        icora_core::intent::IntentRecord,
        icora_core::intent::IntentLinks,
        icora_core::intent::Link,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub version: String,
}

fn build_app(app_state: state::AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::admin::router())
        .merge(routes::oauth::router())
        .merge(routes::intent::router())
        .fallback(routes::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer())
                .layer(axum::middleware::from_fn(middleware::security_headers::apply)),
        )
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icora_wiremock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState::from_env();
    tracing::info!(
        public_base_url = app_state.public_base_url.as_deref().unwrap_or("<request host>"),
        token_expires_in = app_state.token_expires_in,
        "Mock backend configured"
    );
    let app = build_app(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("icora WireMock listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "Failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = build_app(state::AppState::default())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_and_test_endpoints_respond() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get("/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn admin_lists_three_mappings() {
        let (status, body) = get("/__admin/mappings").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mappings"].as_array().unwrap().len(), 3);
        assert_eq!(body["meta"]["total"], 3);
    }

    #[tokio::test]
    async fn unknown_route_reports_path() {
        let (status, body) = get("/nope/here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["path"], "/nope/here");
    }

    #[tokio::test]
    async fn openapi_document_lists_intent_paths() {
        let (status, body) = get("/api-doc/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].get("/intent/").is_some());
        assert!(body["paths"].get("/intent/{intent_id}").is_some());
    }
}
