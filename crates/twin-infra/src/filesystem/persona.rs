//! Persona file loading.
//!
//! The persona is read once at startup. A missing, unreadable or blank file
//! falls back to the default persona instead of failing the process.

use std::path::Path;

use twin_types::chat::Persona;

/// Load the persona text from `path`, trimming surrounding whitespace.
pub async fn load_persona(path: &Path) -> Persona {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let persona = Persona::new(content);
            tracing::info!(
                path = %path.display(),
                chars = persona.text().chars().count(),
                "Loaded persona"
            );
            persona
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No persona file at {}, using default persona", path.display());
            Persona::default()
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using default persona", path.display());
            Persona::default()
        }
    }
}
