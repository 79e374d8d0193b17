use std::sync::LazyLock;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, HOST, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use icora_core::auth::random_hex;
use icora_core::intent::{
    IntentLinks, IntentRecord, IntentSubmission, Link, default_delivery_expectations,
};
use regex::Regex;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

static INTENT_ID: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^intent-[a-f0-9]{10}$"));

const REQUIRED_FIELDS: [&str; 3] = ["name", "description", "deliveryExpectations"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/intent/", post(create_intent))
        .route("/intent/{intent_id}", get(get_intent))
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn require_bearer(headers: &HeaderMap) -> Result<(), AppError> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if bearer { Ok(()) } else { Err(AppError::Unauthorized) }
}

fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.public_base_url {
        return base.clone();
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn parse_submission(body: &[u8]) -> Result<IntentSubmission, AppError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Request body must be JSON: {e}")))?;
    let Some(object) = value.as_object() else {
        return Err(AppError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| object.get(*field).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required field(s): {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/intent/",
    request_body = IntentSubmission,
    responses(
        (status = 201, description = "Intent created", body = IntentRecord,
            headers(("Location" = String, description = "URL of the new intent"))),
        (status = 400, description = "Invalid intent body", body = icora_core::error::ApiError),
        (status = 401, description = "Bearer token missing", body = icora_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "intent"
)]
pub async fn create_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    require_bearer(&headers)?;
    let submission = parse_submission(&body)?;

    let id = format!("intent-{}", random_hex(5));
    let href = IntentRecord::self_href(&public_base_url(&state, &headers), &id);
    let record = IntentRecord {
        id,
        name: submission.name,
        description: submission.description,
        kind: "Intent".to_string(),
        status: "created".to_string(),
        created_at: timestamp(),
        last_modified: None,
        delivery_expectations: submission.delivery_expectations,
        links: IntentLinks {
            self_link: Link { href: href.clone() },
        },
    };
    tracing::info!(event = "mock_intent_created", intent_id = %record.id, name = %record.name, "Created mock intent");

    Ok((StatusCode::CREATED, [(LOCATION, href)], Json(record)).into_response())
}

#[utoipa::path(
    get,
    path = "/intent/{intent_id}",
    params(("intent_id" = String, Path, description = "Intent id, `intent-` followed by 10 hex chars")),
    responses(
        (status = 200, description = "Mock intent", body = IntentRecord),
        (status = 404, description = "Malformed or unknown id", body = icora_core::error::ApiError)
    ),
    tag = "intent"
)]
pub async fn get_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(intent_id): Path<String>,
) -> Result<Json<IntentRecord>, AppError> {
    let pattern = INTENT_ID
        .as_ref()
        .map_err(|e| AppError::Internal(format!("intent id pattern: {e}")))?;
    if !pattern.is_match(&intent_id) {
        return Err(AppError::NotFound {
            description: format!("Intent {intent_id} not found"),
            path: None,
        });
    }

    let href = IntentRecord::self_href(&public_base_url(&state, &headers), &intent_id);
    Ok(Json(IntentRecord {
        id: intent_id,
        name: "MockIntent".to_string(),
        description: "Mock intent for testing".to_string(),
        kind: "Intent".to_string(),
        status: "active".to_string(),
        created_at: "2025-06-11T10:00:00Z".to_string(),
        last_modified: Some(timestamp()),
        delivery_expectations: default_delivery_expectations(),
        links: IntentLinks {
            self_link: Link { href },
        },
    }))
}
