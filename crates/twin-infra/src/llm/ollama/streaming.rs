//! Newline-delimited JSON stream parsing for Ollama `/api/chat`.
//!
//! With `stream: true` Ollama answers with one JSON object per line:
//! 1. N x `{"message":{"content":"..."},"done":false}` -- text fragments
//! 2. `{"done":true, ...}` -- final object with timing stats
//! 3. `{"error":"..."}` may replace any of the above when generation fails
//!
//! Lines can be split across body chunks, so bytes are buffered until a full
//! line is available. A body that ends before the `done` object is a failure.

use std::fmt;

use futures_util::{Stream, StreamExt};

use twin_core::llm::client::FragmentStream;
use twin_types::llm::CompletionError;

use super::types::OllamaChatChunk;

/// What one NDJSON line means for the fragment stream.
#[derive(Debug, PartialEq)]
enum LineOutcome {
    Skip,
    Fragment(String),
    /// Final object; may still carry a last piece of text.
    Done(Option<String>),
    Failed(CompletionError),
}

fn decode_line(line: &[u8]) -> LineOutcome {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineOutcome::Skip;
    }

    let chunk: OllamaChatChunk = match serde_json::from_str(trimmed) {
        Ok(chunk) => chunk,
        Err(e) => {
            return LineOutcome::Failed(CompletionError::Deserialization(format!(
                "ollama stream line: {e}"
            )));
        }
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Failed(CompletionError::Stream(error));
    }

    let content = chunk
        .message
        .map(|m| m.content)
        .filter(|c| !c.is_empty());

    match (chunk.done, content) {
        (true, content) => LineOutcome::Done(content),
        (false, Some(content)) => LineOutcome::Fragment(content),
        (false, None) => LineOutcome::Skip,
    }
}

/// Remove every complete line (including its `\n`) from the front of `buffer`.
fn take_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        lines.push(buffer.drain(..=pos).collect());
    }
    lines
}

/// Turn an NDJSON response body into a fragment stream.
///
/// Generic over the byte source so it can be fed from `reqwest`'s
/// `bytes_stream()` or from an in-memory stream in tests.
pub fn parse_ndjson_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        let mut input_finished = false;

        loop {
            for line in take_lines(&mut buffer) {
                match decode_line(&line) {
                    LineOutcome::Skip => {}
                    LineOutcome::Fragment(text) => yield Ok(text),
                    LineOutcome::Done(tail) => {
                        if let Some(text) = tail {
                            yield Ok(text);
                        }
                        return;
                    }
                    LineOutcome::Failed(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            if input_finished {
                break;
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    yield Err(CompletionError::Stream(format!("response body read: {e}")));
                    return;
                }
                None => {
                    // Flush a final line that lacks its trailing newline.
                    buffer.push(b'\n');
                    input_finished = true;
                }
            }
        }

        yield Err(CompletionError::Stream(
            "stream ended before the model signalled completion".to_string(),
        ));
    })
}
