//! Gemini backend (generateContent API).
//!
//! Serves the `gemini-1.5-flash` descriptor. Streaming uses
//! `streamGenerateContent?alt=sse`; unlike the OpenAI stream there is no
//! `[DONE]` sentinel, the byte stream simply ends.

use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::sse::SseDecoder;
use super::{GenerationRequest, ModelSpec, TokenEvent};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini generateContent client bound to one model descriptor.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: HttpClient,
    api_key: String,
    spec: ModelSpec,
}

impl GeminiBackend {
    pub fn new(client: HttpClient, api_key: String, spec: ModelSpec) -> Self {
        Self {
            client,
            api_key,
            spec,
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{GEMINI_BASE_URL}/{model}:streamGenerateContent?alt=sse&key={}",
            self.api_key
        )
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{GEMINI_BASE_URL}/{model}:generateContent?key={}", self.api_key)
    }

    fn build_body(request: &GenerationRequest) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
        }
    }

    /// Open a streaming generation. Deltas arrive on the returned channel.
    pub async fn stream(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<mpsc::Receiver<TokenEvent>> {
        let response = self
            .client
            .post(self.stream_url(&request.model))
            .json(&Self::build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            anyhow::bail!("Gemini API error {status}: {text}");
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::pump_sse(response, tx));
        Ok(rx)
    }

    async fn pump_sse(response: reqwest::Response, tx: mpsc::Sender<TokenEvent>) {
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.send(TokenEvent::Error(e.to_string())).await;
                    return;
                }
            };

            for frame in decoder.feed(&chunk) {
                let Some(parsed) = frame.json::<GenerateResponse>() else {
                    continue;
                };
                for text in parsed.text_fragments() {
                    if text.is_empty() {
                        continue;
                    }
                    if tx.send(TokenEvent::Delta(text)).await.is_err() {
                        return;
                    }
                }
            }
        }

        let _ = tx.send(TokenEvent::Done).await;
    }

    /// Non-streaming generation.
    pub async fn complete(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let response = self
            .client
            .post(self.generate_url(&request.model))
            .json(&Self::build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            anyhow::bail!("Gemini API error {status}: {text}");
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text_fragments().concat())
    }
}

// ============================================================================
// Wire types (generateContent format)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Every text part across all candidates, in order.
    fn text_fragments(&self) -> Vec<String> {
        let mut fragments = Vec::new();
        for candidate in self.candidates.iter().flatten() {
            let parts = candidate
                .content
                .as_ref()
                .and_then(|c| c.parts.as_ref());
            for part in parts.into_iter().flatten() {
                if let Some(text) = &part.text {
                    fragments.push(text.clone());
                }
            }
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_body_single_user_content() {
        let request = GenerationRequest {
            model: "gemini-1.5-flash".into(),
            prompt: "instructions\n\nUser Query: hi".into(),
        };
        let body = GeminiBackend::build_body(&request);
        assert_eq!(body.contents.len(), 1);
        assert_eq!(body.contents[0].role, "user");
        assert_eq!(body.contents[0].parts[0].text, request.prompt);
    }

    #[test]
    fn test_text_fragments_extraction() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Hello" }, { "text": " world" }] }
            }]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text_fragments(), vec!["Hello", " world"]);
    }

    #[test]
    fn test_text_fragments_tolerates_empty_response() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text_fragments().is_empty());

        // Safety-blocked candidates arrive without content.
        let json = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.text_fragments().is_empty());
    }

    #[test]
    fn test_stream_url_carries_key_and_sse_flag() {
        let backend = GeminiBackend::new(
            HttpClient::new(),
            "test-key".into(),
            ModelSpec::gemini_15_flash(),
        );
        let url = backend.stream_url("gemini-1.5-flash");
        assert!(url.contains(":streamGenerateContent"));
        assert!(url.contains("alt=sse"));
        assert!(url.contains("key=test-key"));
    }
}
