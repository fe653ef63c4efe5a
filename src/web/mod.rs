//! HTTP surface: SSE chat endpoint plus history and model routes.
//!
//! The transport stays thin — every behavioral contract lives in the
//! orchestrator and memory layers. Handlers translate between HTTP and
//! those layers and nothing else.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat::Orchestrator;
use crate::error::ChatError;
use crate::provider::BackendRegistry;

// ============================================================================
// SSE event types
// ============================================================================

/// Events sent to the client over the chat stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Text content fragment.
    Delta { content: String },
    /// Stream complete; carries the full assembled response.
    Done { content: String },
    /// Generation failed after the stream started.
    Error { message: String },
}

// ============================================================================
// Request types and state
// ============================================================================

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    pub model_name: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat-history", get(history_handler))
        .route("/chat-history/clear", post(clear_handler))
        .route("/models", get(models_handler))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until shutdown.
pub async fn run(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Streaming chat endpoint.
///
/// Model resolution happens before the stream is opened, so an unsupported
/// model is a plain HTTP error rather than an in-stream fault. Once
/// streaming starts, failures arrive as a terminal `error` event.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<KeepAliveStream<EventStream>>, (StatusCode, Json<Value>)> {
    let fragments = state
        .orchestrator
        .generate(&request.user_input, &request.model_name)
        .await
        .map_err(|err| (error_status(&err), Json(json!({ "error": err.to_string() }))))?;

    let stream: EventStream = Box::pin(async_stream::stream! {
        let mut fragments = Box::pin(fragments);
        let mut full = String::new();

        while let Some(item) = fragments.next().await {
            match item {
                Ok(delta) => {
                    full.push_str(&delta);
                    yield Ok(sse_event(&ChatEvent::Delta { content: delta }));
                }
                Err(err) => {
                    yield Ok(sse_event(&ChatEvent::Error {
                        message: err.to_string(),
                    }));
                    return;
                }
            }
        }

        yield Ok(sse_event(&ChatEvent::Done { content: full }));
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Full ordered conversation history. Read-only.
async fn history_handler(State(state): State<AppState>) -> Json<Value> {
    let history = state.orchestrator.memory().snapshot();
    Json(json!({ "conversation_history": history }))
}

/// Drop the whole history.
async fn clear_handler(State(state): State<AppState>) -> Json<Value> {
    state.orchestrator.memory().clear();
    Json(json!({ "status": "cleared" }))
}

/// The closed supported-model set with capability flags.
async fn models_handler() -> Json<Value> {
    Json(json!({ "models": BackendRegistry::specs() }))
}

// ============================================================================
// Helpers
// ============================================================================

fn sse_event(event: &ChatEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

fn error_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::UnsupportedModel(_) | ChatError::InvalidRole(_) => StatusCode::BAD_REQUEST,
        ChatError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        ChatError::MemoryPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_event_serialization() {
        let delta = serde_json::to_value(ChatEvent::Delta {
            content: "Hi".into(),
        })
        .unwrap();
        assert_eq!(delta["type"], "delta");
        assert_eq!(delta["content"], "Hi");

        let done = serde_json::to_value(ChatEvent::Done {
            content: "Hi there".into(),
        })
        .unwrap();
        assert_eq!(done["type"], "done");

        let error = serde_json::to_value(ChatEvent::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(error["type"], "error");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&ChatError::UnsupportedModel("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&ChatError::generation(anyhow::anyhow!("net"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&ChatError::MemoryPoisoned),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
