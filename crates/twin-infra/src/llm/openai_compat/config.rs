//! Configuration for OpenAI-compatible backends.

use secrecy::SecretString;

/// Base URL of the hosted OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Placeholder key sent to local endpoints that do not check authentication
/// (e.g. Ollama's `/v1` compatibility layer).
pub const LOCAL_PLACEHOLDER_KEY: &str = "not-needed";

/// Settings used to construct an [`super::OpenAiCompatibleClient`].
pub struct OpenAiCompatConfig {
    /// Human-readable backend name reported in logs (e.g. "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g. "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Default model when a request does not name one.
    pub model: String,
}

/// Hosted OpenAI defaults.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key,
        model: model.into(),
    }
}

/// A self-hosted endpoint at `base_url`; `api_key` may be absent.
pub fn local_defaults(base_url: &str, api_key: Option<SecretString>, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai_compatible".into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key: api_key.unwrap_or_else(|| SecretString::from(LOCAL_PLACEHOLDER_KEY)),
        model: model.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(SecretString::from("sk-test"), "gpt-4o-mini");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[test]
    fn test_local_defaults_without_key() {
        let config = local_defaults("http://localhost:11434/v1/", None, "gemma3:27b");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.api_key.expose_secret(), LOCAL_PLACEHOLDER_KEY);
    }
}
