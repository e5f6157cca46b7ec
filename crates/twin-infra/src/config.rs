//! Configuration loader.
//!
//! Reads `twin.toml` and deserializes it into [`TwinConfig`]. Falls back to
//! defaults when the file is missing or malformed, then layers environment
//! overrides on top.
//!
//! Lookup order for the file: an explicit `--config` path, `./twin.toml`,
//! then `{config_dir}/twin/twin.toml` (e.g. `~/.config/twin/twin.toml`).

use std::path::{Path, PathBuf};

use twin_types::config::{ProviderKind, TwinConfig};

/// File name searched for in the working and user config directories.
pub const CONFIG_FILE_NAME: &str = "twin.toml";

/// Find the configuration file to read, if any.
///
/// An explicit path is always returned (even when it does not exist, so the
/// loader can report it). Otherwise the first existing default location wins.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("twin").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Load configuration from `path`.
///
/// - `None` returns [`TwinConfig::default()`].
/// - A missing or unreadable file logs and returns the default.
/// - A file that fails to parse logs a warning and returns the default.
pub async fn load_config(path: Option<&Path>) -> TwinConfig {
    let Some(config_path) = path else {
        tracing::debug!("No {CONFIG_FILE_NAME} found, using defaults");
        return TwinConfig::default();
    };

    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Config file {} not found, using defaults", config_path.display());
            return TwinConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return TwinConfig::default();
        }
    };

    match toml::from_str::<TwinConfig>(&content) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            TwinConfig::default()
        }
    }
}

/// Apply environment overrides using `lookup` (normally `std::env::var(..).ok()`).
///
/// Empty values are ignored. Values that fail to parse are logged and skipped.
pub fn apply_env_overrides(config: &mut TwinConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(base_url) = get("OLLAMA_BASE_URL") {
        config.model.base_url = Some(base_url.trim().to_string());
    }

    if let Some(origins) = get("CORS_ORIGINS") {
        config.server.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(jwks_url) = get("CLERK_JWKS_URL") {
        config.auth.jwks_url = Some(jwks_url);
    }

    if let Some(model) = get("TWIN_MODEL") {
        config.model.model = model;
    }

    if let Some(provider) = get("TWIN_PROVIDER") {
        match provider.parse::<ProviderKind>() {
            Ok(kind) => config.model.provider = kind,
            Err(err) => tracing::warn!("Ignoring TWIN_PROVIDER: {err}"),
        }
    }

    if let Some(dir) = get("TWIN_MEMORY_DIR") {
        config.chat.memory_dir = PathBuf::from(dir);
    }

    if let Some(path) = get("TWIN_PERSONA_FILE") {
        config.chat.persona_path = PathBuf::from(path);
    }

    if let Some(size) = get("TWIN_WINDOW_SIZE") {
        match size.trim().parse::<usize>() {
            Ok(n) => config.chat.window_size = n,
            Err(err) => tracing::warn!("Ignoring TWIN_WINDOW_SIZE '{size}': {err}"),
        }
    }

    if let Some(dir) = get("TWIN_STATIC_DIR") {
        config.server.static_dir = Some(PathBuf::from(dir));
    }
}
