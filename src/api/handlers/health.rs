/*
 * Responsibility
 * - GET / (疎通用、署名検証なし)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "healthy", "message": "Server is running"})),
    )
}
