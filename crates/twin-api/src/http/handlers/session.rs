//! Session listing HTTP handlers.
//!
//! Endpoints:
//! - GET /sessions      - Summaries of every stored session
//! - GET /sessions/{id} - Full ordered turn list of one session

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use twin_types::chat::{SessionSummary, Turn};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    pub messages: Vec<Turn>,
}

/// GET /sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, AppError> {
    let sessions = state.orchestrator.list_sessions().await?;
    Ok(Json(SessionListResponse { sessions }))
}

/// GET /sessions/{id} - unknown ids yield an empty list.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionHistoryResponse>, AppError> {
    let messages = state.orchestrator.history(&session_id).await?;
    Ok(Json(SessionHistoryResponse {
        session_id,
        messages,
    }))
}
