//! Generation backends and the registry that resolves model identifiers.
//!
//! The supported models form a closed set: `Backend` is a sum type over the
//! providers we actually ship, and `BackendRegistry::resolve` is the only
//! place a data-driven identifier is turned into a handle. Everything a
//! backend needs (API key, HTTP client, model descriptor) is bound at
//! resolve time, so a resolved handle is ready to stream.

mod gemini;
mod openai;
mod registry;
mod sse;

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;
pub use registry::BackendRegistry;
pub use sse::{SseData, SseDecoder};

use serde::Serialize;
use tokio::sync::mpsc;

// ============================================================================
// Stream events and requests
// ============================================================================

/// One event on a backend's token channel.
///
/// The channel closing without `Done` also counts as normal completion —
/// some APIs just end the byte stream instead of sending a sentinel.
#[derive(Debug, Clone)]
pub enum TokenEvent {
    /// A fragment of generated text.
    Delta(String),
    /// Generation finished cleanly.
    Done,
    /// Generation failed; no further events will arrive.
    Error(String),
}

/// Per-call request handed to a backend. Not persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Canonical model id from the resolved descriptor.
    pub model: String,
    /// The fully composed prompt (instruction preamble + user text).
    pub prompt: String,
}

// ============================================================================
// Model descriptors
// ============================================================================

/// Which provider family serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Gemini,
}

/// Immutable description of one supported model, built from static
/// configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    pub id: String,
    pub display_name: String,
    pub backend: BackendKind,
    pub supports_streaming: bool,
}

impl ModelSpec {
    pub fn gpt_4o() -> Self {
        Self {
            id: "gpt-4o".into(),
            display_name: "GPT-4o".into(),
            backend: BackendKind::OpenAi,
            supports_streaming: true,
        }
    }

    pub fn gpt_35_turbo() -> Self {
        Self {
            id: "gpt-3.5-turbo".into(),
            display_name: "GPT-3.5 Turbo".into(),
            backend: BackendKind::OpenAi,
            supports_streaming: true,
        }
    }

    pub fn gemini_15_flash() -> Self {
        Self {
            id: "gemini-1.5-flash".into(),
            display_name: "Gemini 1.5 Flash".into(),
            backend: BackendKind::Gemini,
            supports_streaming: true,
        }
    }
}

// ============================================================================
// Backend handle
// ============================================================================

/// A ready-to-use generation handle, bound to one model and its credentials.
#[derive(Debug, Clone)]
pub enum Backend {
    OpenAi(OpenAiBackend),
    Gemini(GeminiBackend),
}

impl Backend {
    pub fn spec(&self) -> &ModelSpec {
        match self {
            Backend::OpenAi(b) => b.spec(),
            Backend::Gemini(b) => b.spec(),
        }
    }

    /// Provider name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::OpenAi(_) => "openai",
            Backend::Gemini(_) => "gemini",
        }
    }

    /// Open an incremental generation stream.
    ///
    /// The receiver yields `Delta` events as the backend produces text and
    /// terminates with `Done` or `Error`. Dropping the receiver stops the
    /// pump task at its next send.
    pub async fn stream(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<mpsc::Receiver<TokenEvent>> {
        match self {
            Backend::OpenAi(b) => b.stream(request).await,
            Backend::Gemini(b) => b.stream(request).await,
        }
    }

    /// One-shot generation for backends that cannot stream.
    pub async fn complete(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        match self {
            Backend::OpenAi(b) => b.complete(request).await,
            Backend::Gemini(b) => b.complete(request).await,
        }
    }
}
