//! Liveness and landing endpoints.

use axum::Json;
use serde_json::{Value, json};

/// Message returned by `GET /` when no static site is configured.
pub const ROOT_MESSAGE: &str = "AI Digital Twin API with Persistent Memory";

/// GET /health - always 200 while the process accepts requests.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}
