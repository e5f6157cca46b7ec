//! Session, turn, persona and prompt-context types.
//!
//! A session is an append-only, ordered log of [`Turn`]s addressed by a
//! [`SessionId`]. The [`PromptContext`] is the bounded view of that log that
//! actually gets sent to the model.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;
use crate::llm::{Message, MessageRole};

/// Persona used when no persona file is available.
pub const DEFAULT_PERSONA: &str = "You are a helpful AI assistant.";

/// Longest accepted session identifier.
const MAX_SESSION_ID_LEN: usize = 128;

/// Number of characters kept in a session listing preview.
const PREVIEW_MAX_CHARS: usize = 200;

/// Speaker of a persisted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// One message in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role.into(), turn.content.clone())
    }
}

/// Opaque session identifier.
///
/// Identifiers double as record names on disk, so only ASCII letters,
/// digits, `-` and `_` are accepted (at most 128 characters). Freshly minted
/// identifiers are random UUID v4 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        if raw.is_empty() {
            return Err(ChatError::Validation("session id must not be empty".to_string()));
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(ChatError::Validation(format!(
                "session id longer than {MAX_SESSION_ID_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ChatError::Validation(format!(
                "session id '{raw}' may only contain letters, digits, '-' and '_'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One entry of a session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub message_count: usize,
    /// Preview of the most recent turn, `None` for an empty log.
    pub last_message: Option<String>,
}

impl SessionSummary {
    pub fn from_turns(session_id: SessionId, turns: &[Turn]) -> Self {
        Self {
            session_id,
            message_count: turns.len(),
            last_message: turns.last().map(|t| preview(&t.content)),
        }
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_MAX_CHARS {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    cut.push_str("...");
    cut
}

/// The system-level instruction prepended to every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona(String);

impl Persona {
    /// Build a persona from raw text. Blank text falls back to [`DEFAULT_PERSONA`].
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self(DEFAULT_PERSONA.to_string())
    }
}

/// Bounded prompt context for one exchange. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub persona: String,
    /// The most recent turns of the session, oldest first.
    pub history: Vec<Turn>,
    pub user_message: String,
}

impl PromptContext {
    /// Number of messages sent to the model (persona + history + new message).
    pub fn len(&self) -> usize {
        self.history.len() + 2
    }

    /// Always false: persona and user message are always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flatten into role-tagged messages: system, history..., user.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.len());
        messages.push(Message::new(MessageRole::System, self.persona.clone()));
        messages.extend(self.history.iter().map(Message::from));
        messages.push(Message::new(MessageRole::User, self.user_message.clone()));
        messages
    }
}
