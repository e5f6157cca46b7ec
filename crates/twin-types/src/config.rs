//! Service configuration types.
//!
//! `TwinConfig` mirrors the optional `twin.toml` file. Every field has a
//! default so an empty (or missing) file yields a working local setup that
//! talks to Ollama on the default port.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwinConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP listener and surrounding web concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed cross-origin sources; `*` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Directory of a static front-end export served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            static_dir: None,
        }
    }
}

/// Session storage, persona and context window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of most recent turns sent to the model with each request.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Directory holding one JSON record per session.
    #[serde(default = "default_memory_dir")]
    pub memory_dir: PathBuf,
    /// Text file holding the persona.
    #[serde(default = "default_persona_path")]
    pub persona_path: PathBuf,
    /// Capacity of the fragment channel between model and response writer.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_window_size() -> usize {
    10
}

fn default_memory_dir() -> PathBuf {
    PathBuf::from("memory")
}

fn default_persona_path() -> PathBuf {
    PathBuf::from("me.txt")
}

fn default_stream_buffer() -> usize {
    32
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            memory_dir: default_memory_dir(),
            persona_path: default_persona_path(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

/// Which wire protocol the completion backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai_compatible" | "openai" => Ok(ProviderKind::OpenAiCompatible),
            other => Err(format!("invalid provider kind: '{other}'")),
        }
    }
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    /// Base address of the model endpoint; provider default when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Environment variable holding the API key (OpenAI-compatible only).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_model() -> String {
    "gemma3:27b".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            temperature: None,
            max_tokens: None,
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Settings handed through to the external authentication gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Issuer key discovery address (JWKS).
    #[serde(default)]
    pub jwks_url: Option<String>,
}
