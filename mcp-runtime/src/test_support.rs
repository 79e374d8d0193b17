//! Throwaway HTTP backend for exercising the token manager and tool facade.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use icora_core::auth::TOKEN_PATH;
use serde_json::{Value, json};

pub const MOCK_LOCATION: &str = "http://mock.local/intent/intent-0123456789";

#[derive(Clone, Debug)]
pub struct MockBackend {
    pub expires_in: i64,
    pub token_status: u16,
    pub token_body: Option<String>,
    pub token_delay_ms: u64,
    pub intent_status: u16,
    pub intent_body: Option<String>,
    pub health_status: u16,
    pub admin_status: u16,
    pub mapping_count: usize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            expires_in: 3600,
            token_status: 200,
            token_body: None,
            token_delay_ms: 0,
            intent_status: 201,
            intent_body: None,
            health_status: 200,
            admin_status: 200,
            mapping_count: 3,
        }
    }
}

pub struct MockState {
    pub config: MockBackend,
    pub token_requests: AtomicUsize,
    pub intent_requests: AtomicUsize,
    pub last_token_form: Mutex<HashMap<String, String>>,
    pub last_intent: Mutex<Option<Value>>,
    pub last_authorization: Mutex<Option<String>>,
}

pub struct SpawnedBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

pub async fn spawn_backend(config: MockBackend) -> SpawnedBackend {
    let state = Arc::new(MockState {
        config,
        token_requests: AtomicUsize::new(0),
        intent_requests: AtomicUsize::new(0),
        last_token_form: Mutex::new(HashMap::new()),
        last_intent: Mutex::new(None),
        last_authorization: Mutex::new(None),
    });

    let app = Router::new()
        .route(TOKEN_PATH, post(token))
        .route("/intent/", post(create_intent))
        .route("/health", get(health))
        .route("/__admin/mappings", get(admin_mappings))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serve");
    });

    SpawnedBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("valid mock status")
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_token_form.lock().unwrap() = form;
    if state.config.token_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(state.config.token_delay_ms)).await;
    }

    let body = state.config.token_body.clone().unwrap_or_else(|| {
        json!({
            "access_token": format!("cloud_mock_token_{n:016}"),
            "expires_in": state.config.expires_in,
            "token_type": "Bearer"
        })
        .to_string()
    });
    (
        status(state.config.token_status),
        [(CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn create_intent(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.intent_requests.fetch_add(1, Ordering::SeqCst);
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_authorization.lock().unwrap() = authorization.clone();
    *state.last_intent.lock().unwrap() = serde_json::from_str(&body).ok();

    if !authorization.is_some_and(|v| v.starts_with("Bearer ")) {
        return (
            StatusCode::UNAUTHORIZED,
            [(CONTENT_TYPE, "application/json")],
            r#"{"error":"unauthorized"}"#.to_string(),
        )
            .into_response();
    }

    let code = status(state.config.intent_status);
    let body = state.config.intent_body.clone().unwrap_or_else(|| {
        json!({ "id": "intent-0123456789", "status": "created" }).to_string()
    });
    if code == StatusCode::CREATED {
        (code, [(LOCATION, MOCK_LOCATION)], body).into_response()
    } else {
        (code, body).into_response()
    }
}

async fn health(State(state): State<Arc<MockState>>) -> Response {
    (
        status(state.config.health_status),
        axum::Json(json!({ "status": "healthy" })),
    )
        .into_response()
}

async fn admin_mappings(State(state): State<Arc<MockState>>) -> Response {
    let mappings: Vec<Value> = (0..state.config.mapping_count)
        .map(|i| json!({ "id": format!("mapping-{i}") }))
        .collect();
    let total = mappings.len();
    (
        status(state.config.admin_status),
        axum::Json(json!({ "mappings": mappings, "meta": { "total": total } })),
    )
        .into_response()
}
