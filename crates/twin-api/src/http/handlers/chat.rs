//! Chat endpoints.
//!
//! - POST /chat        - single-shot exchange, JSON in and out
//! - POST /chat/stream - same request, answer streamed as server-sent events
//!
//! Stream framing: every event is a single `data:` line. Fragment payloads are
//! escaped so embedded newlines stay on that line; `[DONE]` ends a successful
//! stream and a payload starting with `Error: ` ends a failed one. The resolved
//! session id travels in the `x-session-id` response header.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderName;
use axum::http::header::{CACHE_CONTROL, CONNECTION};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use twin_types::chat::SessionId;

use crate::http::error::AppError;
use crate::state::AppState;

/// Response header carrying the resolved session id of a stream.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Request body shared by both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Existing session to continue; a new one is created when absent.
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: SessionId,
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(body) = payload?;

    let reply = state
        .orchestrator
        .chat(body.session_id.as_deref(), &body.message)
        .await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        session_id: reply.session_id,
    }))
}

/// POST /chat/stream
///
/// Request-level failures (bad body, bad id, unreadable history) are returned
/// as a JSON error before the stream starts. Once streaming, failures arrive
/// as the terminal `Error:` event.
pub async fn stream_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;

    let chat_stream = state
        .orchestrator
        .chat_stream(body.session_id.as_deref(), &body.message)
        .await?;

    let headers = [
        (CACHE_CONTROL, "no-cache".to_string()),
        (CONNECTION, "keep-alive".to_string()),
        (HeaderName::from_static("x-accel-buffering"), "no".to_string()),
        (
            HeaderName::from_static(SESSION_ID_HEADER),
            chat_stream.session_id.to_string(),
        ),
    ];

    let events = chat_stream
        .events
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.payload())));

    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)));
    Ok((headers, sse))
}
