//! Application state wiring the orchestrator to its concrete collaborators.
//!
//! The orchestrator is generic over its store; AppState pins it to the
//! file-backed implementation from `twin-infra`.

use std::sync::Arc;

use anyhow::Context;

use twin_core::chat::orchestrator::{ChatSettings, SessionOrchestrator};
use twin_infra::filesystem::persona::load_persona;
use twin_infra::llm::create_client;
use twin_infra::storage::file_store::FileConversationStore;
use twin_types::config::TwinConfig;

/// Orchestrator pinned to the file-backed store.
pub type ConcreteOrchestrator = SessionOrchestrator<FileConversationStore>;

/// Shared application state, used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: Arc<TwinConfig>,
}

impl AppState {
    /// Open the store, load the persona and build the completion client.
    pub async fn init(config: TwinConfig) -> anyhow::Result<Self> {
        let store = FileConversationStore::open(&config.chat.memory_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to open memory directory {}",
                    config.chat.memory_dir.display()
                )
            })?;

        let persona = load_persona(&config.chat.persona_path).await;
        let client = create_client(&config.model, |key| std::env::var(key).ok())?;

        let settings = ChatSettings::new(persona, config.model.model.clone())
            .with_window_size(config.chat.window_size)
            .with_temperature(config.model.temperature)
            .with_max_tokens(config.model.max_tokens)
            .with_stream_buffer(config.chat.stream_buffer);

        let orchestrator = SessionOrchestrator::new(Arc::new(store), client, settings);
        Ok(Self::new(orchestrator, config))
    }

    pub fn new(orchestrator: ConcreteOrchestrator, config: TwinConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}
