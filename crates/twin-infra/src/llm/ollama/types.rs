//! Ollama `/api/chat` wire types.
//!
//! These are Ollama-specific request/response structures. They are NOT the
//! generic completion types from twin-types, which are backend-agnostic.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// A single message in an Ollama conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Sampling options. Only the knobs the service exposes are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl OllamaOptions {
    /// `None` when no option is set, so the field is omitted entirely.
    pub fn from_parts(temperature: Option<f64>, num_predict: Option<u32>) -> Option<Self> {
        if temperature.is_none() && num_predict.is_none() {
            return None;
        }
        Some(Self {
            temperature,
            num_predict,
        })
    }
}

/// One response object: the whole reply when not streaming, or one
/// newline-delimited chunk when streaming.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    /// Set when the server reports a failure in-band.
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body returned with non-2xx statuses: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaErrorBody {
    pub error: String,
}
