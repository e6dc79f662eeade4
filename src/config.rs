//! Configuration types for the formatting relay.
//!
//! Everything the process needs is gathered into one immutable [`Settings`]
//! value at startup: a YAML file supplies the base values, environment
//! variables override them, and the result is shared by `Arc` with every
//! request. Nothing re-reads the environment afterwards.
//!
//! ```yaml
//! llm:
//!   api_key: sk-...
//!   base_url: https://api.deepseek.com/v1
//!   stream_model: deepseek-chat
//!   non_stream_model: deepseek-chat
//!   temperature: 0.3
//!   timeout: 120
//! app:
//!   log_dir: logs
//!   debug: false
//! server:
//!   port: 8000
//! ```

use crate::error::Word2HtmlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default base URL when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Log directory value that means "log to the console only".
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Upstream model settings.
///
/// Built via [`LlmConfig::builder()`] or deserialised from the `llm:` section.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer token sent to the endpoint.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API, e.g. `https://api.deepseek.com/v1`.
    /// `/chat/completions` is appended.
    pub base_url: String,

    /// Model used for streaming requests.
    pub stream_model: String,

    /// Model used for single-shot requests.
    pub non_stream_model: String,

    /// Sampling temperature. Range: 0.0–2.0. Default: 0.3.
    pub temperature: f32,

    /// Optional cap on generated tokens. Omitted from the request when `None`.
    pub max_tokens: Option<u32>,

    /// Client timeout for one upstream request, in seconds. Default: 120.
    #[serde(alias = "timeout")]
    pub timeout_secs: u64,

    /// Custom system prompt template. Must contain `{rules}`.
    /// If `None`, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            stream_model: String::new(),
            non_stream_model: String::new(),
            temperature: 0.3,
            max_tokens: None,
            timeout_secs: 120,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("stream_model", &self.stream_model)
            .field("non_stream_model", &self.non_stream_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl LlmConfig {
    /// Create a new builder for `LlmConfig`.
    pub fn builder() -> LlmConfigBuilder {
        LlmConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the chat-completions endpoint.
    pub fn endpoint(&self) -> String {
        let base = if self.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            self.base_url.trim()
        };
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn validate(&self) -> Result<(), Word2HtmlError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Word2HtmlError::InvalidConfig(format!(
                "llm.temperature must be within 0.0–2.0, got {}",
                self.temperature
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Word2HtmlError::InvalidConfig(
                "llm.timeout must be greater than zero".into(),
            ));
        }
        if let Some(ref prompt) = self.system_prompt {
            if !prompt.contains("{rules}") {
                return Err(Word2HtmlError::InvalidConfig(
                    "llm.system_prompt must contain the {rules} placeholder".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`LlmConfig`].
#[derive(Debug)]
pub struct LlmConfigBuilder {
    config: LlmConfig,
}

impl LlmConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn stream_model(mut self, model: impl Into<String>) -> Self {
        self.config.stream_model = model.into();
        self
    }

    pub fn non_stream_model(mut self, model: impl Into<String>) -> Self {
        self.config.non_stream_model = model.into();
        self
    }

    /// Set both models at once.
    pub fn model(self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.stream_model(model.clone()).non_stream_model(model)
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the config, validating all fields.
    pub fn build(self) -> Result<LlmConfig, Word2HtmlError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Application-level settings (`app:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where model responses are persisted. Empty or `logs` means console only,
    /// unless [`AppConfig::persist_responses`] says otherwise.
    pub log_dir: String,

    /// Default destination directory for the `format` CLI command.
    pub output_dir: String,

    /// Directory for temporary upload files. Empty means the system temp dir.
    pub upload_dir: String,

    /// Enables DEBUG-level logs in the binary.
    pub debug: bool,

    /// Emit an `llm_receiving` event every N counted chunks. Default: 5.
    pub progress_every: usize,

    /// Explicit response-log policy; `None` derives it from `log_dir`.
    pub persist_responses: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_dir: DEFAULT_LOG_DIR.to_string(),
            output_dir: "outputs".to_string(),
            upload_dir: String::new(),
            debug: false,
            progress_every: 5,
            persist_responses: None,
        }
    }
}

impl AppConfig {
    /// Temp directory for upload files, if one is configured.
    pub fn upload_temp_dir(&self) -> Option<PathBuf> {
        let dir = self.upload_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }

    /// Whether cleaned responses are written to `log_dir`.
    pub fn persists_responses(&self) -> bool {
        match self.persist_responses {
            Some(explicit) => explicit && !self.log_dir.trim().is_empty(),
            None => {
                let dir = self.log_dir.trim();
                !dir.is_empty() && dir != DEFAULT_LOG_DIR
            }
        }
    }
}

/// HTTP listener settings (`server:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address. Default: `0.0.0.0`.
    pub host: String,

    /// Bind port. Default: 8000.
    pub port: u16,

    /// Maximum accepted request body in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the process is configured with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmConfig,
    pub app: AppConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from `path` (or [`DEFAULT_CONFIG_FILE`]), then apply
    /// the process environment.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, Word2HtmlError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Settings::load`] with an explicit variable lookup instead of the
    /// process environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, Word2HtmlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| {
                Word2HtmlError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            info!("Loaded configuration from {}", path.display());
            Self::from_yaml_str(&raw).map_err(|e| Word2HtmlError::ConfigParse {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?
        } else {
            debug!("No configuration file at {}, using defaults", path.display());
            Self::default()
        };

        settings.apply_env_with(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML document. An empty document yields defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` returns the value of a variable; unset and empty values are
    /// both ignored. Numeric values that fail to parse are a config error.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), Word2HtmlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("LLM_STREAM_MODEL") {
            self.llm.stream_model = v;
        }
        if let Some(v) = get("LLM_NON_STREAM_MODEL") {
            self.llm.non_stream_model = v;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("LLM_TIMEOUT") {
            self.llm.timeout_secs = parse_env("LLM_TIMEOUT", &v)?;
        }
        if let Some(v) = get("LOG_DIR") {
            self.app.log_dir = v;
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.app.output_dir = v;
        }
        if let Some(v) = get("UPLOAD_DIR") {
            self.app.upload_dir = v;
        }
        if let Some(v) = get("DEBUG") {
            self.app.debug = v.to_lowercase() == "true";
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v)?;
        }
        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), Word2HtmlError> {
        self.llm.validate()?;
        if self.app.progress_every == 0 {
            return Err(Word2HtmlError::InvalidConfig(
                "app.progress_every must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Word2HtmlError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Word2HtmlError::InvalidConfig(format!("{key}={value:?}: {e}")))
}
