//! Native Ollama completion backend.
//!
//! Talks to `POST {base_url}/api/chat`. Non-streaming calls read the single
//! response object; streaming calls parse the newline-delimited JSON body
//! (see [`streaming`]).
//!
//! The configured request timeout bounds a whole non-streaming call. For
//! streams it is an idle limit between reads, so long generations that keep
//! producing text are never cut off.

pub mod streaming;
pub mod types;

use std::time::Duration;

use futures_util::StreamExt;

use twin_core::llm::client::{CompletionClient, FragmentStream};
use twin_types::error::ConfigError;
use twin_types::llm::{CompletionError, CompletionRequest, CompletionResponse};

use self::streaming::parse_ndjson_stream;
use self::types::{OllamaChatChunk, OllamaChatRequest, OllamaErrorBody, OllamaMessage, OllamaOptions};

/// Address used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama chat backend.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for `model`, using [`DEFAULT_BASE_URL`] when `base_url` is `None`.
    pub fn new(
        base_url: Option<&str>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn to_ollama_request(&self, request: &CompletionRequest, stream: bool) -> OllamaChatRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        OllamaChatRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream,
            options: OllamaOptions::from_parts(request.temperature, request.max_tokens),
        }
    }
}

/// Send the request and turn transport failures and non-2xx statuses into errors.
///
/// `deadline` caps the whole call, body included; streams pass `None`.
async fn send_chat(
    client: &reqwest::Client,
    url: &str,
    body: &OllamaChatRequest,
    deadline: Option<Duration>,
) -> Result<reqwest::Response, CompletionError> {
    let mut request = client.post(url).json(body);
    if let Some(deadline) = deadline {
        request = request.timeout(deadline);
    }
    let response = request
        .send()
        .await
        .map_err(|e| CompletionError::Transport(format!("{url}: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<OllamaErrorBody>(&raw)
        .map(|b| b.error)
        .unwrap_or(raw);
    tracing::warn!(status = %status, error = %message, "Ollama API error response");
    Err(CompletionError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl CompletionClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn invoke(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = self.to_ollama_request(request, false);
        let response = send_chat(
            &self.client,
            &self.chat_url(),
            &body,
            Some(self.request_timeout),
        )
        .await?;
        let status = response.status().as_u16();

        let chunk: OllamaChatChunk = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Transport(format!("ollama response timed out: {e}"))
                } else {
                    CompletionError::Deserialization(format!("ollama response: {e}"))
                }
            })?;

        if let Some(error) = chunk.error {
            return Err(CompletionError::Rejected {
                status,
                message: error,
            });
        }

        Ok(CompletionResponse {
            content: chunk.message.map(|m| m.content).unwrap_or_default(),
            model: if chunk.model.is_empty() {
                body.model
            } else {
                chunk.model
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> FragmentStream {
        let body = self.to_ollama_request(&request, true);
        let client = self.client.clone();
        let url = self.chat_url();

        Box::pin(async_stream::stream! {
            let response = match send_chat(&client, &url, &body, None).await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut fragments = parse_ndjson_stream(response.bytes_stream());
            while let Some(item) = fragments.next().await {
                yield item;
            }
        })
    }
}
