//! ConversationStore trait definition.
//!
//! Durable mapping from session id to an ordered, append-only turn log.

use std::future::Future;

use twin_types::chat::{SessionId, SessionSummary, Turn};
use twin_types::error::StoreError;

/// Persistence port for session logs.
///
/// Implementations live in twin-infra (e.g., `FileConversationStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationStore: Send + Sync {
    /// Read the full log of a session, oldest turn first.
    ///
    /// A session with no record yields an empty log, never an error.
    fn load(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Vec<Turn>, StoreError>> + Send;

    /// Persist `existing + turns` as one all-or-nothing write.
    ///
    /// After a crash the next `load` observes either the old log or the new
    /// one, never a truncated record.
    fn append(
        &self,
        session_id: &SessionId,
        turns: &[Turn],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Enumerate all known sessions. No ordering guarantee.
    fn list_sessions(&self) -> impl Future<Output = Result<Vec<SessionSummary>, StoreError>> + Send;
}
