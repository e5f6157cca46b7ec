//! OpenAI SSE stream to fragment adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to plain
//! text fragments. Chunks without text (role announcements, finish reasons,
//! the trailing usage chunk) produce nothing.

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use twin_core::llm::client::FragmentStream;
use twin_types::llm::CompletionError;

/// Map an async-openai response stream to a [`FragmentStream`].
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> FragmentStream {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| CompletionError::Stream(e.to_string()))?;

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.as_deref() {
                    if !text.is_empty() {
                        yield text.to_string();
                    }
                }
            }
        }
    })
}
