//! Per-request chat orchestration.
//!
//! Every request walks the same phases: resolve the session id, load the
//! stored log, build the bounded prompt context, call the model, then either
//! stream or return the answer and persist the exchange. The user turn and the
//! assistant turn are appended together, and only after the model call
//! finished successfully.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{Instrument, debug, error, info, info_span, warn};

use twin_types::chat::{Persona, PromptContext, SessionId, SessionSummary, Turn};
use twin_types::error::ChatError;
use twin_types::llm::CompletionRequest;

use crate::chat::store::ConversationStore;
use crate::chat::window::ContextWindower;
use crate::llm::box_client::BoxCompletionClient;
use crate::stream::pump::spawn_fragment_pump;
use crate::stream::responder::{StreamingResponder, WireEvent};

/// Step of a chat request, reported with failures and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolveSession,
    LoadHistory,
    BuildContext,
    CallModel,
    StreamAndPersist,
    InvokeAndPersist,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ResolveSession => "resolve_session",
            Phase::LoadHistory => "load_history",
            Phase::BuildContext => "build_context",
            Phase::CallModel => "call_model",
            Phase::StreamAndPersist => "stream_and_persist",
            Phase::InvokeAndPersist => "invoke_and_persist",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Immutable per-process chat settings.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub persona: Persona,
    pub window_size: usize,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Capacity of the channel between the model stream and the response.
    pub stream_buffer: usize,
}

impl ChatSettings {
    pub fn new(persona: Persona, model: impl Into<String>) -> Self {
        Self {
            persona,
            window_size: 10,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            stream_buffer: 32,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }
}

/// A failed chat request.
///
/// `session_id` is set as soon as the id has been resolved, so callers can
/// retry against the same history.
#[derive(Debug)]
pub struct ChatFailure {
    pub session_id: Option<SessionId>,
    pub phase: Phase,
    pub error: ChatError,
}

impl ChatFailure {
    fn new(session_id: Option<&SessionId>, phase: Phase, error: impl Into<ChatError>) -> Self {
        Self {
            session_id: session_id.cloned(),
            phase,
            error: error.into(),
        }
    }
}

impl fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (phase: {})", self.error, self.phase)
    }
}

impl std::error::Error for ChatFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of a single-shot exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub response: String,
}

/// A streamed exchange: the resolved id plus the wire events.
///
/// The event stream always ends with exactly one terminal event. Dropping it
/// early aborts the model call and persists nothing.
pub struct ChatStream {
    pub session_id: SessionId,
    pub events: Pin<Box<dyn Stream<Item = WireEvent> + Send>>,
}

/// Drives chat requests against a store and a completion backend.
pub struct SessionOrchestrator<S: ConversationStore + 'static> {
    store: Arc<S>,
    client: BoxCompletionClient,
    settings: ChatSettings,
    windower: ContextWindower,
}

impl<S: ConversationStore + 'static> SessionOrchestrator<S> {
    pub fn new(store: Arc<S>, client: BoxCompletionClient, settings: ChatSettings) -> Self {
        let windower = ContextWindower::new(settings.window_size);
        Self {
            store,
            client,
            settings,
            windower,
        }
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Run one exchange and return the full answer.
    pub async fn chat(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatReply, ChatFailure> {
        let (session_id, context) = self.prepare(session_id, message).await?;
        let request = self.completion_request(&context);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.client.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
        );
        let response = self
            .client
            .invoke(&request)
            .instrument(span)
            .await
            .map_err(|e| {
                warn!(session_id = %session_id, phase = %Phase::CallModel, error = %e, "Model call failed");
                ChatFailure::new(Some(&session_id), Phase::CallModel, e)
            })?;

        let turns = [
            Turn::user(message),
            Turn::assistant(response.content.clone()),
        ];
        if let Err(e) = self.store.append(&session_id, &turns).await {
            error!(
                session_id = %session_id,
                phase = %Phase::InvokeAndPersist,
                error = %e,
                "Failed to persist exchange"
            );
            return Err(ChatFailure::new(
                Some(&session_id),
                Phase::InvokeAndPersist,
                e,
            ));
        }

        info!(
            session_id = %session_id,
            phase = %Phase::Done,
            response_chars = response.content.chars().count(),
            "Chat exchange complete"
        );

        Ok(ChatReply {
            session_id,
            response: response.content,
        })
    }

    /// Start a streamed exchange.
    ///
    /// Validation, session resolution and history loading happen before this
    /// returns; anything after that is reported through the event stream.
    pub async fn chat_stream(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatStream, ChatFailure> {
        let (session_id, context) = self.prepare(session_id, message).await?;
        let request = self.completion_request(&context);

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.client.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
        );
        let source = self.client.stream(request);
        let capacity = self.settings.stream_buffer;
        let store = Arc::clone(&self.store);
        let sid = session_id.clone();
        let user_message = message.to_string();

        let events = async_stream::stream! {
            let mut fragments = {
                let _entered = span.enter();
                spawn_fragment_pump(source, capacity)
            };
            let mut responder = StreamingResponder::new();

            while let Some(item) = fragments.next().await {
                match item {
                    Ok(text) => {
                        if let Some(event) = responder.fragment(&text) {
                            yield event;
                        }
                    }
                    Err(e) => {
                        warn!(
                            session_id = %sid,
                            phase = %Phase::StreamAndPersist,
                            fragments = responder.fragment_count(),
                            error = %e,
                            "Model stream failed, discarding partial answer"
                        );
                        if let Some(event) = responder.fail(ChatError::Completion(e)) {
                            yield event;
                        }
                        return;
                    }
                }
            }

            let fragment_count = responder.fragment_count();
            let turns = [
                Turn::user(user_message),
                Turn::assistant(responder.transcript()),
            ];
            match store.append(&sid, &turns).await {
                Ok(()) => {
                    info!(
                        session_id = %sid,
                        phase = %Phase::Done,
                        fragments = fragment_count,
                        "Streamed exchange complete"
                    );
                    if let Some(event) = responder.complete() {
                        yield event;
                    }
                }
                Err(e) => {
                    error!(
                        session_id = %sid,
                        phase = %Phase::StreamAndPersist,
                        error = %e,
                        "Failed to persist streamed exchange"
                    );
                    if let Some(event) = responder.fail(ChatError::Persistence(e)) {
                        yield event;
                    }
                }
            }
        };

        Ok(ChatStream {
            session_id,
            events: Box::pin(events),
        })
    }

    /// Summaries of every stored session, most recent first where known.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ChatFailure> {
        self.store
            .list_sessions()
            .await
            .map_err(|e| ChatFailure::new(None, Phase::LoadHistory, e))
    }

    /// Full ordered log of one session; unknown ids yield an empty log.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ChatFailure> {
        let session_id = SessionId::parse(session_id)
            .map_err(|e| ChatFailure::new(None, Phase::ResolveSession, e))?;
        self.store
            .load(&session_id)
            .await
            .map_err(|e| ChatFailure::new(Some(&session_id), Phase::LoadHistory, e))
    }

    /// Validate input, resolve the session and build the prompt context.
    async fn prepare(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<(SessionId, PromptContext), ChatFailure> {
        if message.trim().is_empty() {
            return Err(ChatFailure::new(
                None,
                Phase::ResolveSession,
                ChatError::Validation("message must not be empty".to_string()),
            ));
        }

        let session_id = match session_id.map(str::trim) {
            None | Some("") => {
                let minted = SessionId::generate();
                debug!(session_id = %minted, "Minted new session id");
                minted
            }
            Some(raw) => SessionId::parse(raw)
                .map_err(|e| ChatFailure::new(None, Phase::ResolveSession, e))?,
        };

        let history = self.store.load(&session_id).await.map_err(|e| {
            error!(session_id = %session_id, phase = %Phase::LoadHistory, error = %e, "Failed to load session");
            ChatFailure::new(Some(&session_id), Phase::LoadHistory, e)
        })?;

        let context = self
            .windower
            .build(&self.settings.persona, &history, message);
        debug!(
            session_id = %session_id,
            phase = %Phase::BuildContext,
            stored_turns = history.len(),
            context_turns = context.history.len(),
            "Prompt context built"
        );

        Ok((session_id, context))
    }

    fn completion_request(&self, context: &PromptContext) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: context.to_messages(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}
