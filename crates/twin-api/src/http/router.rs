//! Axum router configuration with middleware.
//!
//! Middleware: CORS, tracing.
//!
//! When `server.static_dir` is set, the exported front-end is served for
//! every path no API route claims, falling back to its `index.html` for
//! client-side routing. Otherwise `GET /` answers with a short JSON message.

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let static_dir = state.config.server.static_dir.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::stream_chat))
        .route("/sessions", get(handlers::session::list_sessions))
        .route("/sessions/{id}", get(handlers::session::get_session));

    match static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            router = router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
            tracing::info!(path = %dir.display(), "Static file serving enabled");
        }
        None => {
            router = router.route("/", get(handlers::health::root));
        }
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin without credentials; otherwise only the listed
/// origins are allowed, with credentials and mirrored methods and headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [HeaderName::from_static(handlers::chat::SESSION_ID_HEADER)];

    if origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers(exposed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use twin_core::chat::orchestrator::{ChatSettings, SessionOrchestrator};
    use twin_core::llm::box_client::BoxCompletionClient;
    use twin_core::llm::client::{CompletionClient, FragmentStream};
    use twin_core::stream::responder::unescape_payload;
    use twin_infra::storage::file_store::FileConversationStore;
    use twin_types::chat::Persona;
    use twin_types::config::TwinConfig;
    use twin_types::llm::{CompletionError, CompletionRequest, CompletionResponse};

    /// Answers every message with a fixed reply; a last message of "fail"
    /// makes the model call fail.
    struct CannedClient;

    fn last_message(request: &CompletionRequest) -> &str {
        request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    impl CompletionClient for CannedClient {
        fn name(&self) -> &str {
            "canned"
        }

        async fn invoke(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, CompletionError> {
            if last_message(request) == "fail" {
                return Err(CompletionError::Transport("connection refused".to_string()));
            }
            Ok(CompletionResponse {
                content: format!("echo: {}", last_message(request)),
                model: request.model.clone(),
            })
        }

        fn stream(&self, request: CompletionRequest) -> FragmentStream {
            let items = if last_message(&request) == "fail" {
                vec![
                    Ok("partial".to_string()),
                    Err(CompletionError::Stream("model runner stopped".to_string())),
                ]
            } else {
                vec![Ok("Hello ".to_string()), Ok("world\nbye".to_string())]
            };
            Box::pin(futures_util::stream::iter(items))
        }
    }

    async fn app_with(config: TwinConfig) -> (TempDir, Router) {
        let tmp = TempDir::new().unwrap();
        let store = FileConversationStore::open(tmp.path().join("memory"))
            .await
            .unwrap();
        let settings = ChatSettings::new(Persona::new("I am the twin."), "test-model");
        let orchestrator =
            SessionOrchestrator::new(Arc::new(store), BoxCompletionClient::new(CannedClient), settings);
        (tmp, build_router(AppState::new(orchestrator, config)))
    }

    async fn app() -> (TempDir, Router) {
        app_with(TwinConfig::default()).await
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    /// Payloads of every `data:` line in an event-stream body.
    fn sse_payloads(raw: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(raw)
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.strip_prefix(' ').unwrap_or(data).to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let (_tmp, app) = app().await;

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "healthy"}));

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(
            json_body(response).await["message"],
            "AI Digital Twin API with Persistent Memory"
        );
    }

    #[tokio::test]
    async fn test_chat_creates_session_and_lists_it() {
        let (_tmp, app) = app().await;

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({"message": "Hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["response"], "echo: Hello");
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                json!({"message": "Again", "sessionId": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["session_id"], session_id.as_str());

        let listing = json_body(app.clone().oneshot(get("/sessions")).await.unwrap()).await;
        let sessions = listing["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["session_id"], session_id.as_str());
        assert_eq!(sessions[0]["message_count"], 4);
        assert_eq!(sessions[0]["last_message"], "echo: Again");

        let history = json_body(
            app.oneshot(get(&format!("/sessions/{session_id}")))
                .await
                .unwrap(),
        )
        .await;
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], json!({"role": "user", "content": "Hello"}));
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_input() {
        let (_tmp, app) = app().await;

        let malformed = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "VALIDATION_ERROR");

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                json!({"message": "hi", "session_id": "../etc/passwd"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let listing = json_body(app.oneshot(get("/sessions")).await.unwrap()).await;
        assert!(listing["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_model_failure_is_bad_gateway_and_persists_nothing() {
        let (_tmp, app) = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                json!({"message": "fail", "session_id": "s1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "COMPLETION_FAILED");
        assert_eq!(body["session_id"], "s1");
        assert!(body["detail"].as_str().unwrap().contains("connection refused"));

        let history = json_body(app.oneshot(get("/sessions/s1")).await.unwrap()).await;
        assert!(history["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_persistence_failure_is_server_error_with_session_id() {
        let (tmp, app) = app().await;
        let record = tmp.path().join("memory").join("damaged.json");
        std::fs::write(&record, "{ not json").unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                json!({"message": "Hello", "session_id": "damaged"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "PERSISTENCE_FAILED");
        assert_eq!(body["session_id"], "damaged");

        let response = app
            .oneshot(post_json(
                "/chat/stream",
                json!({"message": "Hello", "session_id": "damaged"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["session_id"], "damaged");
        assert_eq!(std::fs::read_to_string(&record).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_session_history_rejects_unsafe_id() {
        let (_tmp, app) = app().await;

        let response = app.clone().oneshot(get("/sessions/bad.id")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["session_id"].is_null());

        let response = app.oneshot(get("/sessions/unknown-id")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_frames_fragments_and_persists_exchange() {
        let (_tmp, app) = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat/stream",
                json!({"message": "Hi", "session_id": "streamed"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(headers["x-session-id"], "streamed");

        let payloads = sse_payloads(&body_bytes(response).await);
        assert_eq!(payloads, vec!["Hello ", "world\\nbye", "[DONE]"]);
        let text: String = payloads[..2].iter().map(|p| unescape_payload(p)).collect();
        assert_eq!(text, "Hello world\nbye");

        let history = json_body(app.oneshot(get("/sessions/streamed")).await.unwrap()).await;
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], "Hello world\nbye");
    }

    #[tokio::test]
    async fn test_stream_failure_ends_with_error_event() {
        let (_tmp, app) = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat/stream",
                json!({"message": "fail", "session_id": "broken"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let payloads = sse_payloads(&body_bytes(response).await);
        assert_eq!(payloads.first().map(String::as_str), Some("partial"));
        let last = payloads.last().unwrap();
        assert!(last.starts_with("Error: "), "unexpected terminal: {last}");
        assert!(!payloads.iter().any(|p| p == "[DONE]"));

        let listing = json_body(app.oneshot(get("/sessions")).await.unwrap()).await;
        assert!(listing["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_rejects_empty_message_before_streaming() {
        let (_tmp, app) = app().await;
        let response = app
            .oneshot(post_json("/chat/stream", json!({"message": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cors_listed_origin_allows_credentials() {
        let (_tmp, app) = app().await;

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(preflight).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let foreign = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(foreign).await.unwrap();
        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[tokio::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let mut config = TwinConfig::default();
        config.server.cors_origins = vec!["*".to_string()];
        let (_tmp, app) = app_with(config).await;

        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://anywhere.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_static_dir_serves_site_with_index_fallback() {
        let site = TempDir::new().unwrap();
        std::fs::write(site.path().join("index.html"), "<h1>twin</h1>").unwrap();
        std::fs::write(site.path().join("app.js"), "console.log(1)").unwrap();

        let mut config = TwinConfig::default();
        config.server.static_dir = Some(PathBuf::from(site.path()));
        let (_tmp, app) = app_with(config).await;

        let response = app.clone().oneshot(get("/app.js")).await.unwrap();
        assert_eq!(body_bytes(response).await, b"console.log(1)");

        let response = app.clone().oneshot(get("/chat-page")).await.unwrap();
        assert_eq!(body_bytes(response).await, b"<h1>twin</h1>");

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
