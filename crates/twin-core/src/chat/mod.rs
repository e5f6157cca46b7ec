//! Conversation sessions: persistence port, context windowing and the
//! per-request orchestrator that ties them to a completion backend.

pub mod orchestrator;
pub mod store;
pub mod window;
