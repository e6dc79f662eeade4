//! Pipeline stages for text-to-HTML formatting.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different model backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ llm ──▶ postprocess ──▶ normalize
//! (upload)  (model)  (cleanup)       (document)
//! ```
//!
//! 1. [`input`]: route an upload to [`docx`] or [`decode`] by extension;
//!    Word parsing runs in `spawn_blocking`
//! 2. [`llm`]: the OpenAI-compatible chat client; the only stage with
//!    network I/O
//! 3. [`postprocess`]: strip fences, reasoning blocks and control
//!    characters from the raw model output
//! 4. [`normalize`]: complete, style and validate the HTML document

pub mod decode;
pub mod docx;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod postprocess;
