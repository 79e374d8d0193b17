use icora_core::auth::DEFAULT_EXPIRES_IN_SECS;

#[derive(Clone, Debug)]
pub struct AppState {
    /// Base used for `Location` and `_links.self`; falls back to the request's Host.
    pub public_base_url: Option<String>,
    /// Lifetime advertised in issued tokens, in seconds.
    pub token_expires_in: i64,
}

impl AppState {
    pub fn from_env() -> Self {
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());
        let token_expires_in = std::env::var("TOKEN_EXPIRES_IN")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            public_base_url,
            token_expires_in,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            public_base_url: None,
            token_expires_in: DEFAULT_EXPIRES_IN_SECS,
        }
    }
}
