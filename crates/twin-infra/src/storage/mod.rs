//! Session log storage.
//!
//! Implements the `ConversationStore` trait from `twin-core` on the local
//! filesystem.

pub mod file_store;
