//! Error types for the edgequake-word2html library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`Word2HtmlError`]: **Fatal for the request**: the input could not be
//!   read, the upstream model call failed, or the process could not start.
//!   Surfaced as a single `error` event on streaming paths and as
//!   `{success: false, message}` on buffered paths.
//!
//! * [`ValidationIssue`]: **Non-fatal**: the normalised HTML is usable but a
//!   structural check failed. Collected into
//!   [`crate::output::NormalizedDocument::errors`] and never aborts anything.
//!
//! Messages of variants that reach end users are written in the language of
//! the front-end that consumes them.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-word2html library.
#[derive(Debug, Error)]
pub enum Word2HtmlError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The Word container could not be opened or yielded no text.
    #[error("读取Word文档失败: {0}")]
    Extraction(String),

    /// Neither text nor a file was supplied.
    #[error("请输入文本或上传文件")]
    EmptyInput,

    /// An uploaded file had zero bytes.
    #[error("文件内容为空: {filename}")]
    EmptyFile { filename: String },

    /// An uploaded file decoded to blank text.
    #[error("文件解码后内容为空: {filename}")]
    EmptyDecoded { filename: String },

    /// The request body could not be read as the expected form.
    #[error("请求格式错误: {0}")]
    InvalidRequest(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The model endpoint answered with a non-success status or an error body.
    #[error("LLM API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    /// The request never reached the model endpoint, or the body broke off.
    #[error("LLM request failed: {0}")]
    UpstreamNetwork(String),

    /// The configured client timeout elapsed.
    #[error("LLM request timed out after {secs}s")]
    UpstreamTimeout { secs: u64 },

    /// The model returned no textual content.
    #[error("LLM返回内容为空")]
    EmptyCompletion,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Settings validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::config::Settings`].
    #[error("Failed to parse configuration file '{path}': {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Word2HtmlError {
    /// True for failures caused by what the caller sent, as opposed to the
    /// upstream model or the local host.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Extraction(_)
                | Self::EmptyInput
                | Self::EmptyFile { .. }
                | Self::EmptyDecoded { .. }
                | Self::InvalidRequest(_)
        )
    }
}

/// A non-fatal structural problem found in a normalised document.
///
/// The `Display` form is the exact string placed in the `errors` list of a
/// formatting response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("缺少<html>标签")]
    MissingHtml,

    #[error("缺少<body>标签")]
    MissingBody,

    #[error("缺少<head>标签")]
    MissingHead,

    #[error("<table>标签未正确闭合")]
    UnbalancedTable,

    #[error("<tr>标签未正确闭合")]
    UnbalancedRow,
}
