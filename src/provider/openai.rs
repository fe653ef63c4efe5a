//! OpenAI backend (Chat Completions API).
//!
//! Serves the `gpt-4o` and `gpt-3.5-turbo` descriptors. Streaming uses the
//! SSE variant of the Chat Completions endpoint; the composed prompt is sent
//! as a single user message.

use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::sse::SseDecoder;
use super::{GenerationRequest, ModelSpec, TokenEvent};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions client bound to one model descriptor.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: HttpClient,
    api_key: String,
    spec: ModelSpec,
}

impl OpenAiBackend {
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

    fn build_messages(request: &GenerationRequest) -> Vec<ApiMessage> {
        // The prompt already carries the instruction preamble; it goes out
        // as one user message.
        vec![ApiMessage {
            role: "user".into(),
            content: request.prompt.clone(),
        }]
    }

    async fn send_request(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> anyhow::Result<reqwest::Response> {
        let body = CompletionRequest {
            model: request.model.clone(),
            messages: Self::build_messages(request),
            stream,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            anyhow::bail!("OpenAI API error {status}: {text}");
        }
        Ok(response)
    }

    /// Open a streaming completion. Deltas arrive on the returned channel.
    pub async fn stream(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<mpsc::Receiver<TokenEvent>> {
        let response = self.send_request(request, true).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::pump_sse(response, tx));
        Ok(rx)
    }

    /// Process the SSE body and forward token events until the stream ends
    /// or the receiver goes away.
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
                if frame.is_done() {
                    let _ = tx.send(TokenEvent::Done).await;
                    return;
                }

                let Some(parsed) = frame.json::<StreamChunk>() else {
                    continue;
                };
                for choice in parsed.choices {
                    if let Some(content) = choice.delta.content {
                        if content.is_empty() {
                            continue;
                        }
                        if tx.send(TokenEvent::Delta(content)).await.is_err() {
                            // Receiver dropped: the caller stopped consuming.
                            return;
                        }
                    }
                }
            }
        }

        // Body ended without a [DONE] sentinel; treat it as completion.
        let _ = tx.send(TokenEvent::Done).await;
    }

    /// Non-streaming completion.
    pub async fn complete(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let response = self.send_request(request, false).await?;
        let result: CompletionResponse = response.json().await?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no choices in OpenAI response"))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

// ============================================================================
// Wire types (Chat Completions format)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
