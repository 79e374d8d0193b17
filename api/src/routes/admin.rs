use axum::{Json, Router, routing::get};
use icora_core::auth::TOKEN_PATH;
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/__admin/mappings", get(list_mappings))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminMapping {
    pub id: String,
    #[schema(value_type = Object)]
    pub request: Value,
    #[schema(value_type = Object)]
    pub response: Value,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MappingsMeta {
    pub total: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminMappingsResponse {
    pub mappings: Vec<AdminMapping>,
    pub meta: MappingsMeta,
}

fn mapping(id: &str, method: &str, url_path: &str, status: u16) -> AdminMapping {
    AdminMapping {
        id: id.to_string(),
        request: json!({ "method": method, "urlPath": url_path }),
        response: json!({ "status": status }),
    }
}

/// WireMock-compatible view of the stubbed routes
#[utoipa::path(
    get,
    path = "/__admin/mappings",
    responses((status = 200, description = "Registered mappings", body = AdminMappingsResponse)),
    tag = "admin"
)]
pub async fn list_mappings() -> Json<AdminMappingsResponse> {
    let mappings = vec![
        mapping("oauth-mapping", "POST", TOKEN_PATH, 200),
        mapping("intent-mapping", "POST", "/intent/", 201),
        mapping("test-mapping", "GET", "/test", 200),
    ];
    let total = mappings.len();
    Json(AdminMappingsResponse {
        mappings,
        meta: MappingsMeta { total },
    })
}
