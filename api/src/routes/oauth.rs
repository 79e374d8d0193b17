use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use icora_core::auth::{OAuthTokenResponse, TOKEN_PATH};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(TOKEN_PATH, post(token))
}

/// Password-grant form. Every field is optional at the type level so a
/// missing one can be reported as `invalid_request`. An absent or foreign
/// `grant_type` is `unsupported_grant_type` whatever else is missing.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TokenForm {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

impl TokenForm {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("username", &self.username),
            ("password", &self.password),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

#[utoipa::path(
    post,
    path = "/auth/keycloak_realm/protocol/openid-connect/token",
    request_body(content = TokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = OAuthTokenResponse),
        (status = 400, description = "Missing field or unsupported grant", body = icora_core::error::ApiError)
    ),
    tag = "auth"
)]
pub async fn token(
    State(state): State<AppState>,
    form: Result<Form<TokenForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    if form.grant_type.as_deref() != Some("password") {
        return Err(AppError::UnsupportedGrantType);
    }
    let missing = form.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::InvalidRequest(format!(
            "Missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let scope = form.scope.as_deref().filter(|s| !s.trim().is_empty());
    let issued = OAuthTokenResponse::mock(state.token_expires_in, scope);
    tracing::info!(
        event = "mock_token_issued",
        client_id = form.client_id.as_deref().unwrap_or_default(),
        expires_in = issued.expires_in,
        "Issued mock access token"
    );

    Ok((
        [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
        Json(issued),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    const FULL_FORM: &str = "grant_type=password&username=test-user&password=test-password&client_id=test-client&client_secret=test-secret";

    async fn post_form(state: AppState, body: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(TOKEN_PATH)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn password_grant_issues_keycloak_shaped_token() {
        let (status, headers, body) = post_form(AppState::default(), FULL_FORM).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CACHE_CONTROL], "no-store");
        assert_eq!(headers[PRAGMA], "no-cache");

        let token = body["access_token"].as_str().unwrap();
        let suffix = token.strip_prefix("cloud_mock_token_").unwrap();
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(body["expires_in"], 3600);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["not-before-policy"], 0);
        assert_eq!(body["scope"], "email profile");
    }

    #[tokio::test]
    async fn configured_lifetime_and_requested_scope_are_echoed() {
        let state = AppState {
            token_expires_in: 60,
            ..AppState::default()
        };
        let (_, _, body) = post_form(state, &format!("{FULL_FORM}&scope=openid")).await;
        assert_eq!(body["expires_in"], 60);
        assert_eq!(body["scope"], "openid");
    }

    #[tokio::test]
    async fn missing_field_is_invalid_request() {
        let (status, _, body) = post_form(
            AppState::default(),
            "grant_type=password&username=test-user&client_id=test-client&client_secret=s",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["error_description"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn other_grant_types_are_rejected() {
        let body = FULL_FORM.replace("grant_type=password", "grant_type=client_credentials");
        let (status, _, body) = post_form(AppState::default(), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported_grant_type");
    }

    #[tokio::test]
    async fn grant_type_is_checked_before_missing_fields() {
        let (status, _, body) = post_form(
            AppState::default(),
            "grant_type=client_credentials&client_id=c&client_secret=s",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported_grant_type");

        let (status, _, body) = post_form(AppState::default(), "client_id=c").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported_grant_type");
    }
}
