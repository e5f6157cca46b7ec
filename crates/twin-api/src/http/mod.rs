//! HTTP API for the digital twin.
//!
//! Axum-based JSON endpoints plus a server-sent event stream for chat, with
//! configurable CORS and optional static front-end serving.

pub mod error;
pub mod handlers;
pub mod router;
