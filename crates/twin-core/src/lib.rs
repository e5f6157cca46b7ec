//! Business logic and port definitions for the digital twin chat service.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (`ConversationStore`, `CompletionClient`) and the logic that sits between
//! them: context windowing, fragment streaming and per-request orchestration.
//! It depends only on `twin-types` -- never on `twin-infra` or any I/O crate.

pub mod chat;
pub mod llm;
pub mod stream;
