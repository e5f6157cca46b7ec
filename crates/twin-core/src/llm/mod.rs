//! Completion backend abstractions.
//!
//! - `CompletionClient`: RPITIT trait for concrete backends
//! - `BoxCompletionClient`: object-safe wrapper for runtime backend selection

pub mod box_client;
pub mod client;
