//! Progress events emitted while a formatting request runs.
//!
//! Every relay invocation produces a finite sequence of [`ProgressEvent`]s
//! ending in exactly one terminal event (`complete` or `error`). On the wire
//! each event is one JSON object tagged by `type`:
//!
//! ```json
//! {"type":"llm_receiving","message":"LLM分析中...","chunks":10,"elapsed":1.42}
//! ```

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

/// A boxed stream of progress events.
pub type EventStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

pub const MSG_START: &str = "开始调用LLM分析...";
pub const MSG_RECEIVING: &str = "LLM分析中...";
pub const MSG_LLM_DONE: &str = "LLM分析完成";
pub const MSG_PARSING: &str = "正在解析排版结果...";
pub const MSG_RELAY_COMPLETE: &str = "分析完成";
pub const MSG_FORMAT_COMPLETE: &str = "生成成功";
pub const MSG_NO_HTML: &str = "未能获取LLM生成的HTML内容";

/// One step of a formatting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        message: String,
    },
    LlmReceiving {
        message: String,
        chunks: usize,
        elapsed: f64,
    },
    LlmDone {
        message: String,
        elapsed: f64,
    },
    Parsing {
        message: String,
    },
    Complete {
        message: String,
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        log_file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elapsed: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        valid: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn start() -> Self {
        Self::Start {
            message: MSG_START.to_string(),
        }
    }

    pub fn receiving(chunks: usize, elapsed: Duration) -> Self {
        Self::LlmReceiving {
            message: MSG_RECEIVING.to_string(),
            chunks,
            elapsed: round_secs(elapsed),
        }
    }

    pub fn llm_done(elapsed: Duration) -> Self {
        Self::LlmDone {
            message: MSG_LLM_DONE.to_string(),
            elapsed: round_secs(elapsed),
        }
    }

    pub fn parsing() -> Self {
        Self::Parsing {
            message: MSG_PARSING.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::LlmReceiving { .. } => "llm_receiving",
            Self::LlmDone { .. } => "llm_done",
            Self::Parsing { .. } => "parsing",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// `complete` and `error` end a sequence; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Seconds rounded to two decimals.
pub fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
