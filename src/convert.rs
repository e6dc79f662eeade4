//! Eager (whole-response) formatting entry points.
//!
//! ## Why eager vs. streaming?
//!
//! These functions wait for the model to finish, normalise the HTML and then
//! return. They back the JSON endpoints and the command-line tool. Use
//! [`crate::stream::format_stream`] instead when the caller wants progress
//! while the model is still writing.

use crate::error::Word2HtmlError;
use crate::output::FormattedDocument;
use crate::pipeline::{input, normalize};
use crate::relay::Relay;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Format `text` under `rules` and normalise the result.
///
/// # Errors
/// - [`Word2HtmlError::EmptyInput`] when `text` is blank
/// - any upstream error from the relay
/// - [`Word2HtmlError::EmptyCompletion`] when nothing is left after cleaning
pub async fn format_text(
    relay: &Relay,
    text: &str,
    rules: &str,
) -> Result<FormattedDocument, Word2HtmlError> {
    if text.trim().is_empty() {
        return Err(Word2HtmlError::EmptyInput);
    }
    let start = Instant::now();
    info!("Formatting {} chars of text", text.chars().count());

    let output = relay.call(text, rules).await?;
    if output.html.is_empty() {
        return Err(Word2HtmlError::EmptyCompletion);
    }

    let document = normalize::normalize(&output.html);
    if !document.valid {
        warn!("Formatted HTML has structural issues: {:?}", document.errors);
    }
    info!(
        "Formatting finished in {:.2}s ({} chars of HTML)",
        start.elapsed().as_secs_f64(),
        document.html.chars().count()
    );
    Ok(FormattedDocument {
        document,
        log_file: output.log_file,
    })
}

/// Extract text from an uploaded file, then [`format_text`] it.
///
/// `temp_dir` is where Word uploads are spooled; `None` uses the system temp
/// directory.
pub async fn format_file(
    relay: &Relay,
    bytes: Vec<u8>,
    filename: &str,
    rules: &str,
    temp_dir: Option<PathBuf>,
) -> Result<FormattedDocument, Word2HtmlError> {
    if bytes.is_empty() {
        return Err(Word2HtmlError::EmptyFile {
            filename: filename.to_string(),
        });
    }
    let text = input::extract_content(bytes, filename, temp_dir).await?;
    if text.trim().is_empty() {
        return Err(Word2HtmlError::EmptyDecoded {
            filename: filename.to_string(),
        });
    }
    debug!("Extracted {} chars from {}", text.chars().count(), filename);
    format_text(relay, text.trim(), rules).await
}

/// Format `text` and write the resulting document to `output_path`.
///
/// With `word_export` the Word meta tags are injected so the file opens as a
/// native document when saved with a `.doc` extension.
pub async fn format_to_file(
    relay: &Relay,
    text: &str,
    rules: &str,
    output_path: impl AsRef<Path>,
    word_export: bool,
) -> Result<FormattedDocument, Word2HtmlError> {
    let mut formatted = format_text(relay, text, rules).await?;
    if word_export {
        formatted.document.html = normalize::prepare_for_word(&formatted.document.html);
    }
    write_atomic(output_path.as_ref(), &formatted.document.html).await?;
    Ok(formatted)
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), Word2HtmlError> {
    let write_err = |e| Word2HtmlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Synchronous wrapper around [`format_text`].
///
/// Creates a temporary tokio runtime internally.
pub fn format_text_sync(
    relay: &Relay,
    text: &str,
    rules: &str,
) -> Result<FormattedDocument, Word2HtmlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Word2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(format_text(relay, text, rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{ChatBackend, ChatRequest, DeltaStream};
    use crate::relay::RelayOptions;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed(&'static str);

    #[async_trait]
    impl ChatBackend for Fixed {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, Word2HtmlError> {
            Ok(self.0.to_string())
        }

        async fn complete_stream(&self, _request: &ChatRequest) -> Result<DeltaStream, Word2HtmlError> {
            Err(Word2HtmlError::Internal("not scripted".into()))
        }
    }

    fn relay(reply: &'static str) -> Relay {
        Relay::new(Arc::new(Fixed(reply)), RelayOptions::default())
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_the_call() {
        let err = format_text(&relay("<p>x</p>"), "  \n ", "r").await.unwrap_err();
        assert!(matches!(err, Word2HtmlError::EmptyInput));
    }

    #[tokio::test]
    async fn fragment_is_wrapped_and_validated() {
        let out = format_text(&relay("```html\n<p>正文</p>\n```"), "正文", "r")
            .await
            .unwrap();
        assert!(out.document.html.starts_with("<!DOCTYPE html>"));
        assert!(out.document.html.contains("<p>正文</p>"));
        assert!(out.document.valid);
        assert!(out.document.errors.is_empty());
    }

    #[tokio::test]
    async fn empty_completion_after_cleaning_is_an_error() {
        let err = format_text(&relay("<think>only</think>"), "正文", "r")
            .await
            .unwrap_err();
        assert!(matches!(err, Word2HtmlError::EmptyCompletion));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let err = format_file(&relay("<p>x</p>"), Vec::new(), "a.txt", "r", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Word2HtmlError::EmptyFile { .. }));
    }

    #[tokio::test]
    async fn word_export_writes_meta_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("doc.doc");
        format_to_file(&relay("<p>x</p>"), "x", "r", &path, true)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Word.Document"));
        assert!(!dir.path().join("out").join("doc.doc.tmp").exists());
    }
}
