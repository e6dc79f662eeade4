//! Model interaction: the chat-completion seam and its OpenAI-compatible client.
//!
//! [`ChatBackend`] is the only place network I/O happens. The relay talks to
//! an `Arc<dyn ChatBackend>` built once at startup, so tests can swap in a
//! scripted backend without touching HTTP. All prompt text lives in
//! [`crate::prompts`].
//!
//! ## Streaming wire format
//!
//! OpenAI-compatible servers answer `stream: true` requests with
//! server-sent events, one JSON chunk per `data:` line, terminated by
//! `data: [DONE]`. Network frames do not respect line (or even UTF-8)
//! boundaries, so the body is buffered as bytes and split on `\n` before any
//! decoding happens.

use crate::config::LlmConfig;
use crate::error::Word2HtmlError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// One upstream chunk: `Some(text)` for a content delta, `None` for chunks
/// that carry no text (role announcements, finish markers, keep-alives).
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Option<String>, Word2HtmlError>> + Send>>;

// ── Request types ────────────────────────────────────────────────────────

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Everything needed for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// A chat-completion service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Single-shot completion; returns the message content.
    async fn complete(&self, request: &ChatRequest) -> Result<String, Word2HtmlError>;

    /// Streaming completion; yields one item per upstream chunk.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<DeltaStream, Word2HtmlError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

// ── OpenAI-compatible client ─────────────────────────────────────────────

/// [`ChatBackend`] over any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiBackend {
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiBackend {
    /// Build a client for `config`. The underlying connection pool is shared
    /// by every request made through this backend.
    ///
    /// `timeout_secs` bounds connecting and every idle gap between reads.
    /// Batch calls are additionally capped end to end; a stream may run for
    /// as long as chunks keep arriving.
    pub fn new(config: &LlmConfig) -> Result<Self, Word2HtmlError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| Word2HtmlError::Internal(format!("HTTP client: {e}")))?;
        if config.api_key.is_empty() {
            warn!("llm.api_key is empty; upstream calls will likely be rejected");
        }
        Ok(Self {
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response, Word2HtmlError> {
        let body = ApiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };
        debug!(
            "POST {} model={} stream={} messages={}",
            self.endpoint,
            request.model,
            stream,
            request.messages.len()
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        if !stream {
            builder = builder.timeout(Duration::from_secs(self.timeout_secs));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(Word2HtmlError::Upstream {
                status: Some(status),
                message: error_message(&text),
            });
        }
        Ok(response)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> Word2HtmlError {
        if e.is_timeout() {
            Word2HtmlError::UpstreamTimeout {
                secs: self.timeout_secs,
            }
        } else {
            Word2HtmlError::UpstreamNetwork(e.to_string())
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, Word2HtmlError> {
        let response = self.send(request, false).await?;
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(Word2HtmlError::EmptyCompletion)
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<DeltaStream, Word2HtmlError> {
        let response = self.send(request, true).await?;
        let timeout_secs = self.timeout_secs;
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    Word2HtmlError::UpstreamTimeout { secs: timeout_secs }
                } else {
                    Word2HtmlError::UpstreamNetwork(e.to_string())
                }
            })
        });
        Ok(decode_sse(body.boxed()))
    }
}

/// Pull the human-readable message out of an error body, if it is JSON.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiErrorBody,
    }
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ── SSE decoding ─────────────────────────────────────────────────────────

/// Outcome of one SSE line.
#[derive(Debug, PartialEq)]
enum SseLine {
    /// Comment, blank line, non-data field, or unparseable payload.
    Skip,
    /// `data: [DONE]`.
    Done,
    Delta(Option<String>),
    Failed(String),
}

fn parse_sse_line(raw: &[u8]) -> SseLine {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();
    if data.is_empty() {
        return SseLine::Skip;
    }
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            if let Some(err) = chunk.error {
                return SseLine::Failed(err.message.unwrap_or_else(|| data.to_string()));
            }
            SseLine::Delta(
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta)
                    .and_then(|d| d.content),
            )
        }
        Err(e) => {
            debug!("Skipping non-JSON SSE payload: {e}");
            SseLine::Skip
        }
    }
}

struct SseState {
    body: BoxStream<'static, Result<Bytes, Word2HtmlError>>,
    buf: Vec<u8>,
    done: bool,
}

/// Turn a raw SSE byte stream into a stream of content deltas.
pub(crate) fn decode_sse(body: BoxStream<'static, Result<Bytes, Word2HtmlError>>) -> DeltaStream {
    let state = SseState {
        body,
        buf: Vec::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }

            if let Some(pos) = st.buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                match parse_sse_line(&line) {
                    SseLine::Skip => continue,
                    SseLine::Done => return None,
                    SseLine::Delta(delta) => return Some((Ok(delta), st)),
                    SseLine::Failed(message) => {
                        st.done = true;
                        return Some((Err(Word2HtmlError::Upstream { status: None, message }), st));
                    }
                }
            }

            match st.body.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    // Flush a final line that arrived without a trailing newline.
                    st.done = true;
                    let line = std::mem::take(&mut st.buf);
                    return match parse_sse_line(&line) {
                        SseLine::Delta(delta) => Some((Ok(delta), st)),
                        SseLine::Failed(message) => {
                            Some((Err(Word2HtmlError::Upstream { status: None, message }), st))
                        }
                        SseLine::Skip | SseLine::Done => None,
                    };
                }
            }
        }
    }))
}
