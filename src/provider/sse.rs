//! Minimal SSE decoding for backend response streams.
//!
//! HTTP chunk boundaries do not line up with SSE frame boundaries, so the
//! decoder buffers partial lines between `feed` calls and only hands back
//! complete `data:` frames.

use serde::de::DeserializeOwned;

/// Incremental decoder: bytes in, complete `data:` frames out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, collecting every frame it completes.
    /// Anything after the last newline stays buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseData> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let rest = self.pending.split_off(newline + 1);
            let line = std::mem::replace(&mut self.pending, rest);
            let line = line.trim();

            if let Some(data) = line.strip_prefix("data:") {
                frames.push(SseData {
                    payload: data.trim_start().to_string(),
                });
            }
            // event:/id:/retry: lines and keep-alive comments are ignored;
            // both backend APIs put everything in data frames.
        }
        frames
    }

    /// True if a partial line is still buffered.
    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// The payload of one `data:` frame.
#[derive(Debug, Clone)]
pub struct SseData {
    payload: String,
}

impl SseData {
    /// The `[DONE]` sentinel OpenAI-style streams end with.
    pub fn is_done(&self) -> bool {
        self.payload == "[DONE]"
    }

    /// Decode the payload as JSON, or `None` for frames we don't recognize.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.payload).ok()
    }

    #[cfg(test)]
    pub fn payload(&self) -> &str {
        &self.payload
    }
}
