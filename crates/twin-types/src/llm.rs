//! Completion request/response types.
//!
//! These model the data shapes exchanged with a completion backend:
//! role-tagged messages, the request sent for a prompt context, the
//! single-shot response, and the failure taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in a model conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request to a completion backend.
///
/// `messages` already carries the persona as its leading system entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response from a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
}

/// Failure of a completion call.
///
/// The `Display` output is the human-readable cause reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("model endpoint unreachable: {0}")]
    Transport(String),

    #[error("model rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("model stream failed: {0}")]
    Stream(String),

    #[error("malformed model response: {0}")]
    Deserialization(String),

    #[error("invalid completion request: {0}")]
    InvalidRequest(String),
}
