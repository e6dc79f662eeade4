//! Persistence of cleaned model responses for later inspection.
//!
//! Local deployments keep every response as an `.html` file; hosted ones only
//! get a truncated preview in the log stream. Either way the caller receives a
//! string to put in the `log_file` field, and a failed write never changes the
//! HTML that goes back to the client.

use crate::config::AppConfig;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Returned in place of a path when responses are not written to disk.
pub const CONSOLE_SENTINEL: &str = "cloud_logged";

/// Characters of HTML included in the console preview.
pub const PREVIEW_CHARS: usize = 500;

/// Where cleaned responses go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseLog {
    /// Preview to the log stream only.
    Console,
    /// One file per response in this directory.
    Directory(PathBuf),
}

impl ResponseLog {
    /// Pick the policy configured in `app`.
    pub fn from_config(app: &AppConfig) -> Self {
        if app.persists_responses() {
            Self::Directory(PathBuf::from(app.log_dir.trim()))
        } else {
            Self::Console
        }
    }

    /// Record `html`, produced for `input`, and return the `log_file` value.
    pub async fn record(&self, input: &str, html: &str) -> String {
        match self {
            Self::Console => log_preview(html),
            Self::Directory(dir) => match write_response(dir, input, html).await {
                Ok(path) => {
                    debug!("Saved model response to {}", path.display());
                    path.to_string_lossy().into_owned()
                }
                Err(e) => {
                    warn!("Failed to save model response in {}: {}", dir.display(), e);
                    log_preview(html)
                }
            },
        }
    }
}

fn log_preview(html: &str) -> String {
    let preview: String = html.chars().take(PREVIEW_CHARS).collect();
    info!("LLM response HTML (truncated): {}...", preview);
    CONSOLE_SENTINEL.to_string()
}

/// `llm_response_{hash}_{unix_millis}.html`, hash taken over the input text.
pub fn response_file_name(input: &str, millis: u128) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hash = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    format!("llm_response_{hash}_{millis}.html")
}

async fn write_response(dir: &Path, input: &str, html: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(response_file_name(input, millis));
    tokio::fs::write(&path, html).await?;
    Ok(path)
}
