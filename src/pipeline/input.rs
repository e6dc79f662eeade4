//! Content extraction: turn uploaded bytes into plain text for the model.
//!
//! ## Why a temp file for Word uploads?
//!
//! Uploads arrive as an in-memory buffer, but zip readers want a seekable
//! file and very large documents should not be held twice. The bytes are
//! written to a [`tempfile::NamedTempFile`] which is deleted when the guard is
//! dropped, on every exit path, even when parsing fails or the request is
//! cancelled mid-way.

use crate::error::Word2HtmlError;
use crate::pipeline::{decode, docx};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How an upload is interpreted, decided by its declared extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `.docx` / `.doc`: parsed as a Word container.
    WordContainer,
    /// Anything else: decoded as text.
    PlainText,
}

impl ContentKind {
    /// Classify by the extension of `filename` (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("docx") | Some("doc") => Self::WordContainer,
            _ => Self::PlainText,
        }
    }
}

/// Extract plain text from an uploaded file.
///
/// Word containers are parsed on the blocking pool; everything else is
/// decoded with the fallback encoding list, which never fails.
///
/// # Arguments
/// * `bytes`: raw upload
/// * `filename`: name declared by the client, used only for its extension
/// * `temp_dir`: where to place the temporary container file
///   (`None` = system temp dir)
pub async fn extract_content(
    bytes: Vec<u8>,
    filename: &str,
    temp_dir: Option<PathBuf>,
) -> Result<String, Word2HtmlError> {
    let kind = ContentKind::from_filename(filename);
    info!("Extracting {} ({} bytes, {:?})", filename, bytes.len(), kind);

    match kind {
        ContentKind::WordContainer => {
            tokio::task::spawn_blocking(move || extract_word(&bytes, temp_dir.as_deref()))
                .await
                .map_err(|e| Word2HtmlError::Internal(format!("spawn_blocking: {e}")))?
        }
        ContentKind::PlainText => Ok(extract_plain(&bytes)),
    }
}

/// Synchronous variant of [`extract_content`].
pub fn extract_content_blocking(
    bytes: &[u8],
    filename: &str,
    temp_dir: Option<&Path>,
) -> Result<String, Word2HtmlError> {
    match ContentKind::from_filename(filename) {
        ContentKind::WordContainer => extract_word(bytes, temp_dir),
        ContentKind::PlainText => Ok(extract_plain(bytes)),
    }
}

fn extract_word(bytes: &[u8], temp_dir: Option<&Path>) -> Result<String, Word2HtmlError> {
    let mut tmp = temp_file(temp_dir)?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Word2HtmlError::Internal(format!("tempfile write: {e}")))?;
    debug!("Wrote upload to {}", tmp.path().display());

    // `tmp` is removed when it goes out of scope, whatever the result.
    docx::extract_text(tmp.path())
}

fn extract_plain(bytes: &[u8]) -> String {
    let decoded = decode::decode_text(bytes);
    debug!(
        "Decoded upload as {} ({} chars{})",
        decoded.encoding,
        decoded.text.chars().count(),
        if decoded.lossy { ", lossy" } else { "" }
    );
    decoded.text
}

fn temp_file(dir: Option<&Path>) -> Result<tempfile::NamedTempFile, Word2HtmlError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload_").suffix(".docx");
    let created = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|e| Word2HtmlError::Internal(format!("upload dir {}: {e}", dir.display())))?;
            builder.tempfile_in(dir)
        }
        None => builder.tempfile(),
    };
    created.map_err(|e| Word2HtmlError::Internal(format!("tempfile: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_word_extensions() {
        assert_eq!(ContentKind::from_filename("a.docx"), ContentKind::WordContainer);
        assert_eq!(ContentKind::from_filename("A.DOC"), ContentKind::WordContainer);
        assert_eq!(ContentKind::from_filename("notes.txt"), ContentKind::PlainText);
        assert_eq!(ContentKind::from_filename("README"), ContentKind::PlainText);
        assert_eq!(ContentKind::from_filename(""), ContentKind::PlainText);
    }

    #[test]
    fn plain_text_is_decoded() {
        let text = extract_content_blocking("你好".as_bytes(), "a.md", None).unwrap();
        assert_eq!(text, "你好");
    }

    #[test]
    fn broken_word_upload_cleans_up_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_content_blocking(b"garbage", "a.docx", Some(dir.path())).unwrap_err();
        assert!(matches!(err, Word2HtmlError::Extraction(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn async_plain_text_path() {
        let text = extract_content(vec![0xD6, 0xD0, 0xCE, 0xC4], "gbk.txt", None)
            .await
            .unwrap();
        assert_eq!(text, "中文");
    }
}
