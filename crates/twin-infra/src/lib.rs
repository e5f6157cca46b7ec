//! Infrastructure layer for the digital twin.
//!
//! Contains implementations of the ports defined in `twin-core`: the
//! file-backed conversation store and the completion backends (native Ollama
//! and OpenAI-compatible), plus the configuration and persona loaders.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod storage;
