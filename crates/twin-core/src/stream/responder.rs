//! Incremental response framing.
//!
//! [`StreamingResponder`] turns model fragments into wire events while
//! accumulating the full transcript for persistence. Each fragment payload is
//! escaped so that a line break inside a fragment can never be mistaken for
//! an event boundary; clients reverse the escaping with [`unescape_payload`].
//!
//! A response ends with exactly one terminal event: `[DONE]` on success, or a
//! single-line `Error: <cause>` on failure.

use std::fmt;

/// Terminal payload signalling successful completion.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Prefix of the terminal payload signalling failure.
pub const ERROR_PREFIX: &str = "Error: ";

/// One event on the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// An escaped text fragment.
    Fragment(String),
    Done,
    /// A single-line failure cause.
    Error(String),
}

impl WireEvent {
    /// The data carried on the wire for this event.
    pub fn payload(&self) -> String {
        match self {
            WireEvent::Fragment(escaped) => escaped.clone(),
            WireEvent::Done => DONE_PAYLOAD.to_string(),
            WireEvent::Error(cause) => format!("{ERROR_PREFIX}{cause}"),
        }
    }
}

/// Escape a fragment for transport: `\` -> `\\`, LF -> `\n`, CR -> `\r`.
pub fn escape_fragment(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Exact inverse of [`escape_fragment`]. Unknown escape pairs pass through.
pub fn unescape_payload(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut chars = payload.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn single_line(cause: &str) -> String {
    cause
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Frames one streamed response.
#[derive(Debug, Default)]
pub struct StreamingResponder {
    transcript: String,
    fragments: usize,
    finished: bool,
}

impl StreamingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fragment and frame it. Empty fragments emit nothing.
    pub fn fragment(&mut self, text: &str) -> Option<WireEvent> {
        if self.finished || text.is_empty() {
            return None;
        }
        self.transcript.push_str(text);
        self.fragments += 1;
        Some(WireEvent::Fragment(escape_fragment(text)))
    }

    /// Emit the success terminal. Only the first terminal call yields an event.
    pub fn complete(&mut self) -> Option<WireEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(WireEvent::Done)
    }

    /// Emit the failure terminal. Only the first terminal call yields an event.
    pub fn fail(&mut self, cause: impl fmt::Display) -> Option<WireEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(WireEvent::Error(single_line(&cause.to_string())))
    }

    /// Concatenation of every fragment framed so far, unescaped.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }
}
