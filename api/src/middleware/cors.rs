use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a CORS layer from the `ICORA_CORS_ORIGINS` env var.
///
/// Unset, empty, or `*` allows any origin (the mock is called from agent
/// sandboxes and browser consoles); otherwise a comma-separated allow-list.
pub fn build_cors_layer() -> CorsLayer {
    cors_layer_for(std::env::var("ICORA_CORS_ORIGINS").ok().as_deref())
}

fn cors_layer_for(raw: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "*")
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::cors_layer_for;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    async fn allowed_origin(raw: Option<&str>, origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/health", get(ok))
            .layer(cors_layer_for(raw));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", origin)
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn unset_origins_allow_any() {
        assert_eq!(
            allowed_origin(None, "https://agent.example").await.as_deref(),
            Some("*")
        );
    }

    #[tokio::test]
    async fn explicit_list_only_echoes_listed_origins() {
        let raw = Some("https://a.example, https://b.example");
        assert_eq!(
            allowed_origin(raw, "https://b.example").await.as_deref(),
            Some("https://b.example")
        );
        assert_eq!(allowed_origin(raw, "https://evil.example").await, None);
    }
}
