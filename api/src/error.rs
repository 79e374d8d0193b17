use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use icora_core::error::{ApiError, codes};

/// Handler error that renders as an OAuth-style JSON body.
#[derive(Debug)]
pub enum AppError {
    /// Required token form field missing (400)
    InvalidRequest(String),
    /// Grant type other than `password` (400)
    UnsupportedGrantType,
    /// Missing or non-Bearer Authorization header (401)
    Unauthorized,
    /// Intent body failed validation (400)
    Validation(String),
    /// Unknown resource (404)
    NotFound {
        description: String,
        path: Option<String>,
    },
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, description, path) = match self {
            AppError::InvalidRequest(description) => {
                (StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, description, None)
            }
            AppError::UnsupportedGrantType => (
                StatusCode::BAD_REQUEST,
                codes::UNSUPPORTED_GRANT_TYPE,
                "Only password grant type is supported".to_string(),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Bearer token required".to_string(),
                None,
            ),
            AppError::Validation(description) => {
                (StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR, description, None)
            }
            AppError::NotFound { description, path } => {
                (StatusCode::NOT_FOUND, codes::NOT_FOUND, description, path)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL_ERROR,
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ApiError {
                error: code.to_string(),
                error_description: description,
                path,
            }),
        )
            .into_response()
    }
}
