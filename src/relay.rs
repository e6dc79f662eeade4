//! Model relay: one formatting request in, progress events and HTML out.
//!
//! The relay owns nothing per request. It holds the shared upstream backend
//! and the immutable options derived from [`Settings`]; every call builds its
//! own messages, buffer and event stream, so one `Relay` can be cloned into
//! any number of concurrent request tasks.
//!
//! ## Event sequence
//!
//! ```text
//! streaming: start → llm_receiving(0) → llm_receiving(N)* → llm_done → complete
//! batch:     start → complete
//! failure:   start → … → error
//! ```

use crate::config::Settings;
use crate::error::Word2HtmlError;
use crate::output::RelayOutput;
use crate::pipeline::llm::{ChatBackend, ChatMessage, ChatRequest, OpenAiBackend};
use crate::pipeline::postprocess::clean_html_response;
use crate::progress::{round_secs, EventStream, ProgressEvent, MSG_RELAY_COMPLETE};
use crate::prompts::{build_system_prompt, user_message, DEFAULT_SYSTEM_PROMPT};
use crate::response_log::ResponseLog;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Whether the upstream answer is streamed or fetched in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Stream,
    Batch,
}

/// Per-process relay options, derived once from [`Settings`].
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub stream_model: String,
    pub non_stream_model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// System prompt template containing `{rules}`.
    pub system_prompt: String,
    /// Emit `llm_receiving` every this many counted chunks. [`Relay::new`]
    /// treats zero as 1.
    pub progress_every: usize,
    pub response_log: ResponseLog,
}

impl RelayOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            stream_model: settings.llm.stream_model.clone(),
            non_stream_model: settings.llm.non_stream_model.clone(),
            temperature: settings.llm.temperature,
            max_tokens: settings.llm.max_tokens,
            system_prompt: settings
                .llm
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            progress_every: settings.app.progress_every.max(1),
            response_log: ResponseLog::from_config(&settings.app),
        }
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Sends formatting requests upstream and reports progress.
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn ChatBackend>,
    options: Arc<RelayOptions>,
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("backend", &"<dyn ChatBackend>")
            .field("options", &self.options)
            .finish()
    }
}

impl Relay {
    /// `options.progress_every` is raised to 1 when it is zero.
    pub fn new(backend: Arc<dyn ChatBackend>, mut options: RelayOptions) -> Self {
        options.progress_every = options.progress_every.max(1);
        Self {
            backend,
            options: Arc::new(options),
        }
    }

    /// Build a relay talking to the OpenAI-compatible endpoint in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, Word2HtmlError> {
        let backend = OpenAiBackend::new(&settings.llm)?;
        info!("Relay upstream: {}", backend.endpoint());
        Ok(Self::new(
            Arc::new(backend),
            RelayOptions::from_settings(settings),
        ))
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Build the upstream request for `text` under `rules`.
    pub fn build_request(&self, text: &str, rules: &str, mode: RelayMode) -> ChatRequest {
        let model = match mode {
            RelayMode::Stream => &self.options.stream_model,
            RelayMode::Batch => &self.options.non_stream_model,
        };
        ChatRequest {
            model: model.clone(),
            messages: vec![
                ChatMessage::system(build_system_prompt(&self.options.system_prompt, rules)),
                ChatMessage::user(user_message(text)),
            ],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }

    /// Run one request and report it as a stream of progress events.
    ///
    /// The stream always ends with exactly one `complete` or `error` event.
    /// Dropping it early cancels the upstream call.
    pub fn stream(&self, text: &str, rules: &str, mode: RelayMode) -> EventStream {
        let request = self.build_request(text, rules, mode);
        let backend = Arc::clone(&self.backend);
        let options = Arc::clone(&self.options);
        let text = text.to_owned();

        Box::pin(async_stream::stream! {
            let started = Instant::now();
            yield ProgressEvent::start();
            info!("Relay started: model={} mode={:?} input_chars={}", request.model, mode, text.chars().count());

            let raw = match mode {
                RelayMode::Batch => match backend.complete(&request).await {
                    Ok(content) => content,
                    Err(e) => {
                        error!("Batch call failed: {}", e);
                        yield ProgressEvent::error(e.to_string());
                        return;
                    }
                },
                RelayMode::Stream => {
                    let mut deltas = match backend.complete_stream(&request).await {
                        Ok(deltas) => deltas,
                        Err(e) => {
                            error!("Streaming call failed: {}", e);
                            yield ProgressEvent::error(e.to_string());
                            return;
                        }
                    };
                    yield ProgressEvent::receiving(0, started.elapsed());

                    let mut buffer = String::new();
                    let mut chunks = 0usize;
                    while let Some(item) = deltas.next().await {
                        match item {
                            Ok(Some(delta)) => {
                                buffer.push_str(&delta);
                                chunks += 1;
                                if chunks % options.progress_every == 0 {
                                    yield ProgressEvent::receiving(chunks, started.elapsed());
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                error!("Stream broke off after {} chunks: {}", chunks, e);
                                yield ProgressEvent::error(e.to_string());
                                return;
                            }
                        }
                    }
                    debug!("Stream finished: {} chunks, {} bytes", chunks, buffer.len());
                    yield ProgressEvent::llm_done(started.elapsed());
                    buffer
                }
            };

            let html = clean_html_response(&raw);
            let log_file = options.response_log.record(&text, &html).await;
            let elapsed = match mode {
                RelayMode::Batch => Some(round_secs(started.elapsed())),
                RelayMode::Stream => None,
            };
            info!("Relay complete: {} chars of HTML in {:.2}s", html.chars().count(), started.elapsed().as_secs_f64());
            yield ProgressEvent::Complete {
                message: MSG_RELAY_COMPLETE.to_string(),
                html,
                log_file: Some(log_file),
                elapsed,
                valid: None,
                errors: None,
            };
        })
    }

    /// Batch request that returns the cleaned HTML directly.
    pub async fn call(&self, text: &str, rules: &str) -> Result<RelayOutput, Word2HtmlError> {
        let request = self.build_request(text, rules, RelayMode::Batch);
        let started = Instant::now();
        let raw = self.backend.complete(&request).await?;
        let html = clean_html_response(&raw);
        let log_file = self.options.response_log.record(text, &html).await;
        info!(
            "Batch call complete: {} chars of HTML in {:.2}s",
            html.chars().count(),
            started.elapsed().as_secs_f64()
        );
        Ok(RelayOutput { html, log_file })
    }
}
