use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::error::IntentError;

/// Keycloak-style token path served by the mock backend.
pub const TOKEN_PATH: &str = "/auth/keycloak_realm/protocol/openid-connect/token";

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Subtracted from every expiry to absorb clock skew and request latency.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 30;

/// Password-grant settings for one token endpoint. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub scope: Option<String>,
}

impl AuthConfig {
    /// Build a config for a WireMock deployment, deriving the token URL from its base.
    pub fn for_wiremock(
        wiremock_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        scope: Option<String>,
    ) -> Result<Self, IntentError> {
        let base = normalize_base_url(wiremock_url)?;
        Ok(Self {
            token_url: format!("{base}{TOKEN_PATH}"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
            scope: scope.filter(|s| !s.trim().is_empty()),
        })
    }

    /// Form fields for the `grant_type=password` request, in wire order.
    pub fn password_grant_form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
        form
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Validate a service base URL and strip trailing slashes so paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String, IntentError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| IntentError::validation(format!("invalid WireMock URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IntentError::validation(format!(
            "WireMock URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(IntentError::validation(format!(
            "WireMock URL '{trimmed}' has no host"
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// A bearer token together with the instant it stops being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// `expires_at = issued_at + expires_in - safety_margin`
    pub fn issue(
        value: String,
        expires_in: Option<i64>,
        safety_margin: Duration,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let lifetime = Duration::seconds(expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        Self {
            value,
            expires_at: issued_at + lifetime - safety_margin,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// First `n` characters, for logs and tool output.
    pub fn preview(value: &str, n: usize) -> String {
        value.chars().take(n).collect()
    }
}

/// The subset of a token response the client relies on.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Full token response served by the mock backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(rename = "not-before-policy")]
    pub not_before_policy: i64,
    pub session_state: String,
    pub scope: String,
}

impl OAuthTokenResponse {
    /// Fresh random credentials, shaped like a Keycloak password-grant response.
    pub fn mock(expires_in: i64, scope: Option<&str>) -> Self {
        Self {
            access_token: generate_access_token(),
            expires_in,
            refresh_expires_in: 1800,
            refresh_token: generate_refresh_token(),
            token_type: "Bearer".to_string(),
            not_before_policy: 0,
            session_state: format!("session_{}", random_hex(4)),
            scope: scope.unwrap_or("email profile").to_string(),
        }
    }
}

/// Format: `cloud_mock_token_` + 16 hex chars.
pub fn generate_access_token() -> String {
    format!("cloud_mock_token_{}", random_hex(8))
}

/// Format: `cloud_refresh_` + 16 hex chars.
pub fn generate_refresh_token() -> String {
    format!("cloud_refresh_{}", random_hex(8))
}

/// Generate `n` random bytes and return as hex string.
pub fn random_hex(n: usize) -> String {
    let bytes: Vec<u8> = (0..n).map(|_| rand::thread_rng().r#gen::<u8>()).collect();
    hex::encode(&bytes)
}
