use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Error body returned by the mock backend.
/// Mirrors the OAuth2 error shape (`error` + `error_description`) so token and
/// intent endpoints fail the same way a Keycloak-fronted TMF921 API would.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "unauthorized", "unsupported_grant_type")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub error_description: String,
    /// Request path, only set for unmatched routes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Error codes used by the mock backend
pub mod codes {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const UNSUPPORTED_GRANT_TYPE: &str = "unsupported_grant_type";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_server_error";
}

/// Failure taxonomy shared by the token manager and the tool facade.
///
/// Never crosses the tool-call boundary: the facade renders it into a
/// [`crate::tool::ToolResult`] error envelope.
#[derive(Debug, Error)]
pub enum IntentError {
    /// An operation needed auth configuration that was never installed.
    #[error("{0}")]
    Configuration(String),
    /// Token endpoint unreachable, non-2xx, or returned an unusable body.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// Intent or connectivity endpoint answered with a non-success status.
    #[error("Backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },
    /// The backend could not be reached at all.
    #[error("{0}")]
    Transport(String),
    /// Malformed caller input.
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl IntentError {
    pub fn not_configured() -> Self {
        Self::Configuration(
            "Authentication not configured. Use icoraintent_configure_auth first.".to_string(),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_carries_status_and_body_verbatim() {
        let err = IntentError::Backend {
            status: 500,
            body: "boom".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("500"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn not_configured_points_at_configure_tool() {
        let rendered = IntentError::not_configured().to_string();
        assert!(rendered.contains("not configured"));
        assert!(rendered.contains("icoraintent_configure_auth"));
    }

    #[test]
    fn api_error_omits_missing_path() {
        let body = serde_json::to_value(ApiError {
            error: codes::UNAUTHORIZED.to_string(),
            error_description: "Bearer token required".to_string(),
            path: None,
        })
        .unwrap();
        assert!(body.get("path").is_none());
        assert_eq!(body["error"], "unauthorized");
    }
}
