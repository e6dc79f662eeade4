//! Streaming formatting API: progress events while the model writes.
//!
//! ## Why stream?
//!
//! A long document takes the model a minute or more. Forwarding the relay's
//! progress events lets a browser show that work is happening, and the
//! final event already carries the normalised document so no second request
//! is needed.
//!
//! [`format_stream`] wraps [`Relay::stream`]: intermediate events pass
//! through untouched, the relay's `complete` is replaced by `parsing`
//! followed by a `complete` whose HTML has been through the normaliser.

use crate::pipeline::normalize;
use crate::progress::{EventStream, ProgressEvent, MSG_FORMAT_COMPLETE, MSG_NO_HTML};
use crate::relay::{Relay, RelayMode};
use futures::StreamExt;
use tracing::{info, warn};

/// Format `text` under `rules`, yielding progress and then the document.
///
/// Exactly one terminal event (`complete` or `error`) ends the stream.
pub fn format_stream(relay: &Relay, text: &str, rules: &str) -> EventStream {
    let mut upstream = relay.stream(text, rules, RelayMode::Stream);

    Box::pin(async_stream::stream! {
        while let Some(event) = upstream.next().await {
            match event {
                ProgressEvent::Complete { html, log_file, elapsed, .. } => {
                    if html.is_empty() {
                        warn!("Model finished without any HTML");
                        yield ProgressEvent::error(MSG_NO_HTML);
                        return;
                    }
                    yield ProgressEvent::parsing();
                    let document = normalize::normalize(&html);
                    if !document.valid {
                        warn!("Formatted HTML has structural issues: {:?}", document.errors);
                    }
                    info!("Streamed document ready ({} chars)", document.html.chars().count());
                    yield ProgressEvent::Complete {
                        message: MSG_FORMAT_COMPLETE.to_string(),
                        html: document.html,
                        log_file,
                        elapsed,
                        valid: Some(document.valid),
                        errors: Some(document.errors),
                    };
                    return;
                }
                ProgressEvent::Error { message } => {
                    yield ProgressEvent::Error { message };
                    return;
                }
                other => yield other,
            }
        }
        warn!("Relay stream ended without a terminal event");
        yield ProgressEvent::error(MSG_NO_HTML);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Word2HtmlError;
    use crate::pipeline::llm::{ChatBackend, ChatRequest, DeltaStream};
    use crate::relay::RelayOptions;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Arc;

    struct Chunks(Vec<&'static str>);

    #[async_trait]
    impl ChatBackend for Chunks {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, Word2HtmlError> {
            Ok(self.0.concat())
        }

        async fn complete_stream(&self, _request: &ChatRequest) -> Result<DeltaStream, Word2HtmlError> {
            let items: Vec<_> = self.0.iter().map(|c| Ok(Some(c.to_string()))).collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn relay(chunks: Vec<&'static str>) -> Relay {
        Relay::new(Arc::new(Chunks(chunks)), RelayOptions::default())
    }

    #[tokio::test]
    async fn complete_is_preceded_by_parsing_and_normalised() {
        let events: Vec<_> = format_stream(&relay(vec!["<table>", "<tr><td>1</td></tr>", "</table>"]), "t", "r")
            .collect()
            .await;
        let kinds: Vec<_> = events.iter().map(ProgressEvent::kind).collect();
        assert_eq!(kinds, vec!["start", "llm_receiving", "llm_done", "parsing", "complete"]);
        match events.last() {
            Some(ProgressEvent::Complete { message, html, valid, errors, .. }) => {
                assert_eq!(message, MSG_FORMAT_COMPLETE);
                assert!(html.contains("border-collapse: collapse"));
                assert_eq!(*valid, Some(true));
                assert_eq!(errors.as_deref(), Some(&[][..]));
            }
            other => panic!("unexpected terminal event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_html_becomes_error() {
        let events: Vec<_> = format_stream(&relay(vec!["<think>", "x</think>"]), "t", "r")
            .collect()
            .await;
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Error { message: MSG_NO_HTML.to_string() })
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }
}
