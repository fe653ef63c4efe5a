//! Streaming orchestrator: resolves a backend, records the user turn, drives
//! incremental generation, and commits the assistant turn when the stream
//! completes.
//!
//! One `generate` call moves through RESOLVING → USER_RECORDED → STREAMING
//! and ends COMMITTED or FAILED. There is no retry loop here; retries are a
//! caller concern.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::ChatError;
use crate::memory::{ConversationMemory, Role};
use crate::provider::{BackendRegistry, GenerationRequest, TokenEvent};

/// Fixed instruction preamble prepended to every prompt.
pub const INSTRUCTION_PREAMBLE: &str = "You are a helpful assistant. Answer the user's query \
directly and concisely, staying factual and keeping a natural conversational tone. If a \
question is ambiguous, say what additional detail would help.";

/// Compose the full prompt for one request. Pure and deterministic.
pub fn compose_prompt(user_input: &str) -> String {
    format!("{INSTRUCTION_PREAMBLE}\n\nUser Query: {user_input}")
}

/// Coordinates one generation request end to end.
///
/// Holds the backend registry and the shared conversation memory; each
/// `generate` call owns its accumulator, so concurrent calls never see each
/// other's partial output.
pub struct Orchestrator {
    registry: BackendRegistry,
    memory: Arc<ConversationMemory>,
}

impl Orchestrator {
    pub fn new(registry: BackendRegistry, memory: Arc<ConversationMemory>) -> Self {
        Self { registry, memory }
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Run one request, returning a lazy stream of text fragments.
    ///
    /// Resolution failures return immediately with no memory mutation. The
    /// user turn is recorded before any generation work, so it survives a
    /// failed or abandoned stream. On clean completion the concatenation of
    /// every yielded fragment is committed as the assistant turn; on failure
    /// the partial accumulation is discarded and the stream ends with
    /// `GenerationFailed`.
    pub async fn generate(
        &self,
        user_input: &str,
        model_id: &str,
    ) -> Result<impl Stream<Item = Result<String, ChatError>> + Send + 'static, ChatError> {
        let backend = self.registry.resolve(model_id)?;

        self.memory.append(Role::User, user_input)?;

        let request = GenerationRequest {
            model: backend.spec().id.clone(),
            prompt: compose_prompt(user_input),
        };
        info!(model = %request.model, backend = backend.name(), "starting generation");

        let rx = if backend.spec().supports_streaming {
            backend.stream(&request).await.map_err(ChatError::generation)?
        } else {
            // One-shot fallback: fetch the full text, emit it as a single
            // fragment so the rest of the pipeline is identical.
            let text = backend
                .complete(&request)
                .await
                .map_err(ChatError::generation)?;
            let (tx, rx) = mpsc::channel(2);
            let _ = tx.try_send(TokenEvent::Delta(text));
            let _ = tx.try_send(TokenEvent::Done);
            rx
        };

        Ok(Self::drive(Arc::clone(&self.memory), rx))
    }

    /// Pump the backend channel, forwarding fragments and committing the
    /// assistant turn on completion.
    ///
    /// If the consumer drops the stream early, this generator is dropped
    /// with it: nothing commits, and the backend pump task stops at its
    /// next send into the closed channel.
    fn drive(
        memory: Arc<ConversationMemory>,
        mut rx: mpsc::Receiver<TokenEvent>,
    ) -> impl Stream<Item = Result<String, ChatError>> + Send + 'static {
        async_stream::stream! {
            let mut accumulated = String::new();

            loop {
                match rx.recv().await {
                    Some(TokenEvent::Delta(text)) => {
                        if text.is_empty() {
                            continue;
                        }
                        accumulated.push_str(&text);
                        yield Ok(text);
                    }
                    Some(TokenEvent::Error(message)) => {
                        error!("generation stream failed: {message}");
                        yield Err(ChatError::generation(anyhow::anyhow!(message)));
                        return;
                    }
                    // Done, or the pump ended without a sentinel: both are
                    // normal completion.
                    Some(TokenEvent::Done) | None => break,
                }
            }

            // Commit the full concatenation, even when it is empty — an
            // empty completed response is the backend's answer, not ours to
            // drop.
            if let Err(err) = memory.append(Role::Assistant, accumulated) {
                yield Err(err);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
