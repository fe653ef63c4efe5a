//! Integration tests for the HTTP surface.
//!
//! Each test builds an independent router with its own in-memory state and
//! drives it with `tower::ServiceExt::oneshot`. The streaming happy path is
//! covered at the orchestrator level (scripted token streams); these tests
//! pin down the transport contract around it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use chatrelay::chat::Orchestrator;
use chatrelay::memory::{ConversationMemory, Role};
use chatrelay::provider::BackendRegistry;
use chatrelay::web::{create_router, AppState};

// =============================================================================
// Helpers
// =============================================================================

fn make_state() -> (AppState, Arc<ConversationMemory>) {
    let memory = Arc::new(ConversationMemory::new());
    let registry = BackendRegistry::new("test-openai-key".into(), "test-gemini-key".into());
    let orchestrator = Arc::new(Orchestrator::new(registry, Arc::clone(&memory)));
    (AppState { orchestrator }, memory)
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Health and models
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (state, _) = make_state();
    let resp = create_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_models_lists_supported_set() {
    let (state, _) = make_state();
    let resp = create_router(state)
        .oneshot(Request::get("/models").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let models = json["models"].as_array().unwrap();
    let ids: Vec<_> = models.iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["gpt-4o", "gpt-3.5-turbo", "gemini-1.5-flash"]);
    assert!(models.iter().all(|m| m["supports_streaming"].as_bool().unwrap()));
}

// =============================================================================
// Chat rejection path
// =============================================================================

#[tokio::test]
async fn test_chat_unknown_model_rejected_before_any_mutation() {
    let (state, memory) = make_state();
    let resp = create_router(state)
        .oneshot(post_json(
            "/chat",
            r#"{"user_input": "X", "model_name": "unknown-model"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("unsupported model"));

    // Rejection happened before any memory mutation.
    assert!(memory.snapshot().is_empty());
}

#[tokio::test]
async fn test_chat_rejects_malformed_body() {
    let (state, _) = make_state();
    let resp = create_router(state)
        .oneshot(post_json("/chat", r#"{"user_input": "no model"}"#))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

// =============================================================================
// History round-trip
// =============================================================================

#[tokio::test]
async fn test_history_round_trip_and_clear() {
    let (state, memory) = make_state();
    let app = create_router(state);

    memory.append(Role::User, "Hello").unwrap();
    memory.append(Role::Assistant, "Hi there").unwrap();

    let resp = app
        .clone()
        .oneshot(Request::get("/chat-history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    let turns = json["conversation_history"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["content"], "Hello");
    assert_eq!(turns[1]["role"], "assistant");
    assert_eq!(turns[1]["content"], "Hi there");

    // Clear, then the history reads empty.
    let resp = app
        .clone()
        .oneshot(
            Request::post("/chat-history/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "cleared");

    let resp = app
        .oneshot(Request::get("/chat-history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert!(json["conversation_history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_empty_at_start() {
    let (state, _) = make_state();
    let resp = create_router(state)
        .oneshot(Request::get("/chat-history").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert!(json["conversation_history"].as_array().unwrap().is_empty());
}
