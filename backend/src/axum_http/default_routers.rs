use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
