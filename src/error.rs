//! Error taxonomy for the chat relay.
//!
//! Library code returns `ChatError`; the binary edge uses `anyhow`.

use thiserror::Error;

/// Errors surfaced by the memory, registry, and orchestration layers.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A role string outside the closed user/assistant set reached a boundary.
    #[error("invalid role {0:?}: must be \"user\" or \"assistant\"")]
    InvalidRole(String),

    /// The requested model is not in the supported set. Terminal, reported
    /// before any generation work or memory mutation.
    #[error("unsupported model {0:?}")]
    UnsupportedModel(String),

    /// The backend failed while opening or driving a generation stream.
    #[error("generation failed: {0}")]
    GenerationFailed(#[source] anyhow::Error),

    /// The conversation memory lock was poisoned on a write path.
    #[error("conversation memory lock poisoned")]
    MemoryPoisoned,
}

impl ChatError {
    /// Wrap an underlying backend/transport failure.
    pub fn generation(err: impl Into<anyhow::Error>) -> Self {
        Self::GenerationFailed(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ChatError::InvalidRole("system".into());
        assert!(err.to_string().contains("system"));

        let err = ChatError::UnsupportedModel("gpt-9".into());
        assert!(err.to_string().contains("gpt-9"));

        let err = ChatError::generation(anyhow::anyhow!("connection reset"));
        assert!(err.to_string().contains("connection reset"));
    }
}
