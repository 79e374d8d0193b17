use axum::http::Uri;

use crate::error::AppError;

pub mod admin;
pub mod health;
pub mod intent;
pub mod oauth;

/// Fallback for every unmatched route.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        description: "The requested resource was not found".to_string(),
        path: Some(uri.path().to_string()),
    }
}
