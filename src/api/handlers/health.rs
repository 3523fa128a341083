/*
 * Responsibility
 * - GET /        (welcome)
 * - GET /health  (疎通用)
 * - GET /version (crate version)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub const WELCOME: &str = "Welcome to the Financial Data Platform API";

pub async fn root() -> &'static str {
    WELCOME
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

pub async fn version() -> impl IntoResponse {
    Json(json!({"version": env!("CARGO_PKG_VERSION")}))
}
