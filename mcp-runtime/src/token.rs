use chrono::{Duration, Utc};
use icora_core::auth::{AccessToken, AuthConfig, DEFAULT_SAFETY_MARGIN_SECS, TokenGrant};
use icora_core::error::IntentError;
use tokio::sync::Mutex;

use crate::util::{REQUEST_TIMEOUT, body_text};

/// Owns one password-grant token and refreshes it lazily on read.
///
/// The cached token sits behind an async mutex that stays locked while a
/// refresh is in flight, so callers racing on an expired token share a single
/// token request instead of each issuing their own.
pub struct TokenManager {
    config: AuthConfig,
    http: reqwest::Client,
    safety_margin: Duration,
    current: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(config: AuthConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            current: Mutex::new(None),
        }
    }

    pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Return the cached token while it is valid, otherwise fetch a new one.
    pub async fn valid_token(&self) -> Result<String, IntentError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.refresh().await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    async fn refresh(&self) -> Result<AccessToken, IntentError> {
        tracing::info!(
            event = "oauth_token_request",
            token_url = %self.config.token_url,
            client_id = %self.config.client_id,
            "Requesting password-grant token"
        );

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&self.config.password_grant_form())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(event = "oauth_token_failed", error = %e, "Token endpoint unreachable");
                IntentError::Authentication(format!("token endpoint unreachable: {e}"))
            })?;

        let status = resp.status();
        let body = body_text(resp).await;
        if !status.is_success() {
            tracing::error!(
                event = "oauth_token_failed",
                status = status.as_u16(),
                "Token endpoint rejected the password grant"
            );
            return Err(IntentError::Authentication(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        let grant: TokenGrant = serde_json::from_str(&body).map_err(|e| {
            IntentError::Authentication(format!("malformed token response: {e}"))
        })?;

        let token = AccessToken::issue(
            grant.access_token,
            grant.expires_in,
            self.safety_margin,
            Utc::now(),
        );
        tracing::info!(
            event = "oauth_token_acquired",
            expires_at = %token.expires_at,
            "OAuth2 token acquired"
        );
        Ok(token)
    }
}
