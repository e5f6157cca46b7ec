//! Completion backend implementations.
//!
//! Contains concrete implementations of the [`CompletionClient`] trait defined
//! in `twin-core` and a factory ([`create_client`]) that builds the configured
//! backend behind a [`BoxCompletionClient`].
//!
//! [`CompletionClient`]: twin_core::llm::client::CompletionClient

pub mod ollama;
pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use twin_core::llm::box_client::BoxCompletionClient;
use twin_types::config::{ModelConfig, ProviderKind};
use twin_types::error::ConfigError;

use self::ollama::OllamaClient;
use self::openai_compat::OpenAiCompatibleClient;
use self::openai_compat::config::{local_defaults, openai_defaults};

/// Create a [`BoxCompletionClient`] from a [`ModelConfig`].
///
/// `lookup` resolves environment variables (normally `std::env::var(..).ok()`).
///
/// # Errors
///
/// Returns [`ConfigError::MissingApiKey`] when the hosted OpenAI API is
/// selected (no `base_url`) and the configured key variable is unset.
pub fn create_client(
    config: &ModelConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BoxCompletionClient, ConfigError> {
    match config.provider {
        ProviderKind::Ollama => {
            let client = OllamaClient::new(
                config.base_url.as_deref(),
                config.model.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(BoxCompletionClient::new(client))
        }
        ProviderKind::OpenAiCompatible => {
            let api_key = lookup(&config.api_key_env)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from);

            let oai_config = match config.base_url.as_deref() {
                Some(base_url) => local_defaults(base_url, api_key, &config.model),
                None => {
                    let key =
                        api_key.ok_or_else(|| ConfigError::MissingApiKey(config.api_key_env.clone()))?;
                    openai_defaults(key, &config.model)
                }
            };
            Ok(BoxCompletionClient::new(OpenAiCompatibleClient::new(oai_config)))
        }
    }
}
