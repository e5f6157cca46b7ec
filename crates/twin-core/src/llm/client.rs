//! CompletionClient trait definition.
//!
//! Uses RPITIT for `invoke` and a `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the `BoxCompletionClient` wrapper).

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use twin_types::llm::{CompletionError, CompletionRequest, CompletionResponse};

/// Lazy, finite, non-restartable sequence of text fragments.
///
/// Fragments arrive in generation order. A failure is delivered as a final
/// `Err` item; fragments already yielded before it remain valid.
pub type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send + 'static>>;

/// Trait for completion backends (Ollama, OpenAI-compatible, ...).
///
/// No retries happen behind this trait: every transport or remote error is
/// surfaced to the caller as a [`CompletionError`].
pub trait CompletionClient: Send + Sync {
    /// Human-readable backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and wait for the full response text.
    fn invoke(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, CompletionError>> + Send;

    /// Send a streaming request. Nothing happens until the stream is polled.
    fn stream(&self, request: CompletionRequest) -> FragmentStream;
}
