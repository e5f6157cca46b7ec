//! Application error type mapping to HTTP status codes and a JSON body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use twin_core::chat::orchestrator::ChatFailure;
use twin_types::error::ChatError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A chat request failed inside the orchestrator.
    Chat(ChatFailure),
    /// Request body could not be decoded.
    Validation(String),
}

impl From<ChatFailure> for AppError {
    fn from(e: ChatFailure) -> Self {
        AppError::Chat(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(failure) => match &failure.error {
                ChatError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                ChatError::SessionNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "SESSION_NOT_FOUND",
                    format!("Session '{id}' not found"),
                ),
                ChatError::Completion(e) => (
                    StatusCode::BAD_GATEWAY,
                    "COMPLETION_FAILED",
                    format!("Model call failed: {e}"),
                ),
                ChatError::Persistence(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_FAILED",
                    format!("Failed to save conversation: {e}"),
                ),
            },
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.parts();
        let session_id = match &self {
            AppError::Chat(failure) => failure.session_id.as_ref().map(|id| id.to_string()),
            AppError::Validation(_) => None,
        };

        let body = json!({
            "detail": detail,
            "error": code,
            "session_id": session_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
