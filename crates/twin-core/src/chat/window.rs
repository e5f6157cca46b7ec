//! Context windowing.
//!
//! The persisted log is unbounded; what goes to the model is the persona,
//! the last `W` turns, and the new user message.

use twin_types::chat::{Persona, PromptContext, Turn};

/// Builds bounded prompt contexts with a fixed window size.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindower {
    window_size: usize,
}

impl ContextWindower {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// See [`build_context`].
    pub fn build(&self, persona: &Persona, history: &[Turn], user_message: &str) -> PromptContext {
        build_context(persona, history, user_message, self.window_size)
    }
}

/// Derive the prompt context for one exchange.
///
/// Keeps the most recent `min(history.len(), window_size)` turns in their
/// original order. `history` is only borrowed and never modified.
pub fn build_context(
    persona: &Persona,
    history: &[Turn],
    user_message: &str,
    window_size: usize,
) -> PromptContext {
    let start = history.len().saturating_sub(window_size);

    PromptContext {
        persona: persona.text().to_string(),
        history: history[start..].to_vec(),
        user_message: user_message.to_string(),
    }
}
