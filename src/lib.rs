//! # edgequake-word2html
//!
//! Lay out plain text or Word documents as styled, Word-compatible HTML using
//! an OpenAI-compatible chat model.
//!
//! ## Why this crate?
//!
//! Formatting rules such as "title in bold, size two, centred; body in SimSun
//! with a first-line indent" are easy to state and tedious to apply. This
//! crate hands the text and the rules to a chat model, then turns whatever
//! comes back into a complete HTML document that Word opens as one of its
//! own: fences and reasoning blocks stripped, skeleton added, tables styled
//! and the structure checked.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text / .docx upload
//!  │
//!  ├─ 1. Input      decode text (UTF-8, GBK, GB18030, …) or read the Word body
//!  ├─ 2. Prompt     system template + rules, user message with the text
//!  ├─ 3. Relay      stream or batch call, progress events, response log
//!  ├─ 4. Clean      strip fences, <think> blocks and control characters
//!  └─ 5. Normalise  complete document, default styles, validation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_word2html::{format_text, Relay, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // config.yaml if present, then LLM_API_KEY / LLM_BASE_URL / … overrides
//!     let settings = Settings::load(None)?;
//!     let relay = Relay::from_settings(&settings)?;
//!     let out = format_text(&relay, "第一章 总则\n本办法适用于……", "标题黑体二号居中").await?;
//!     println!("{}", out.document.html);
//!     if !out.document.valid {
//!         eprintln!("issues: {:?}", out.document.errors);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `word2html` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-word2html = { version = "2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod relay;
pub mod response_log;
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AppConfig, LlmConfig, LlmConfigBuilder, ServerConfig, Settings};
pub use convert::{format_file, format_text, format_text_sync, format_to_file};
pub use error::{ValidationIssue, Word2HtmlError};
pub use output::{FormatRequest, FormatResponse, FormattedDocument, NormalizedDocument, RelayOutput};
pub use pipeline::llm::{ChatBackend, OpenAiBackend};
pub use progress::{EventStream, ProgressEvent};
pub use relay::{Relay, RelayMode, RelayOptions};
pub use server::Server;
pub use stream::format_stream;
