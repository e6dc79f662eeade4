//! Request handlers.
//!
//! Handlers only translate between HTTP and the library: they read the form
//! or JSON body, call into [`crate::convert`] / [`crate::stream`], and shape
//! the answer. Failures are reported in the body (`success: false` or an
//! `error` event) rather than through the status code, except where the
//! request itself is unusable.

use crate::convert;
use crate::error::Word2HtmlError;
use crate::output::{FormatRequest, FormatResponse, HealthResponse};
use crate::pipeline::{input, normalize};
use crate::progress::{EventStream, ProgressEvent};
use crate::server::form::FormFields;
use crate::server::state::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Download name used when the client sends none.
pub const DEFAULT_DOWNLOAD_NAME: &str = "document.doc";

// ── Info ────────────────────────────────────────────────────────────────────

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Word2HTML API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Convert Word documents to formatted HTML using LLM",
        "endpoints": {
            "health": "/health",
            "format_stream": "/format/stream",
            "format_text": "/format/text",
            "format_file": "/format/file",
            "download_word": "/download/word",
        }
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// ── Formatting ──────────────────────────────────────────────────────────────

/// `POST /format/stream`: progress as server-sent events.
pub async fn format_stream(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let events = match stream_input(&state, multipart).await {
        Ok((text, rules)) => {
            info!("Streaming format request: {} chars", text.chars().count());
            crate::stream::format_stream(&state.relay, &text, &rules)
        }
        Err(e) => {
            log_failure("format/stream", &e);
            let frame: EventStream = Box::pin(stream::iter([ProgressEvent::error(e.to_string())]));
            frame
        }
    };
    sse_response(events)
}

async fn stream_input(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(String, String), Word2HtmlError> {
    let multipart = multipart.map_err(|e| Word2HtmlError::InvalidRequest(e.body_text()))?;
    let mut form = FormFields::collect(multipart).await?;
    let rules = form.rules();

    let text = match form.file.take() {
        Some(file) => {
            input::extract_content(
                file.bytes.to_vec(),
                &file.filename,
                state.settings.app.upload_temp_dir(),
            )
            .await?
        }
        None => form.value("text").unwrap_or_default().to_string(),
    };

    if text.trim().is_empty() {
        return Err(Word2HtmlError::EmptyInput);
    }
    Ok((text, rules))
}

fn sse_response(events: EventStream) -> Response {
    let frames = events.map(|event| Event::default().json_data(&event));
    (
        [("x-accel-buffering", "no")],
        Sse::new(frames).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

/// `POST /format/text`: buffered formatting of a JSON body.
pub async fn format_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FormatRequest>,
) -> (StatusCode, Json<FormatResponse>) {
    match convert::format_text(&state.relay, &request.text, &request.rules).await {
        Ok(formatted) => (
            StatusCode::OK,
            Json(FormatResponse::success(formatted.document)),
        ),
        Err(e @ Word2HtmlError::EmptyInput) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(FormatResponse::failure(e.to_string())),
        ),
        Err(e) => {
            log_failure("format/text", &e);
            (StatusCode::OK, Json(FormatResponse::failure(e.to_string())))
        }
    }
}

/// `POST /format/file`: buffered formatting of an uploaded file.
pub async fn format_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<FormatResponse>) {
    let form = match multipart {
        Ok(multipart) => FormFields::collect(multipart).await,
        Err(e) => Err(Word2HtmlError::InvalidRequest(e.body_text())),
    };
    let form = match form {
        Ok(form) => form,
        Err(e) => return unprocessable(e),
    };
    let rules = form.rules();
    let Some(file) = form.file else {
        return unprocessable(Word2HtmlError::EmptyInput);
    };

    let result = convert::format_file(
        &state.relay,
        file.bytes.to_vec(),
        &file.filename,
        &rules,
        state.settings.app.upload_temp_dir(),
    )
    .await;

    match result {
        Ok(formatted) => (
            StatusCode::OK,
            Json(FormatResponse::success(formatted.document)),
        ),
        Err(e) => {
            log_failure("format/file", &e);
            (StatusCode::OK, Json(FormatResponse::failure(e.to_string())))
        }
    }
}

fn unprocessable(e: Word2HtmlError) -> (StatusCode, Json<FormatResponse>) {
    warn!("Rejected request: {}", e);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(FormatResponse::failure(e.to_string())),
    )
}

// ── Download ────────────────────────────────────────────────────────────────

/// `POST /download/word`: the posted HTML as a Word-openable `.doc`.
pub async fn download_word(multipart: Result<Multipart, MultipartRejection>) -> Response {
    let form = match multipart {
        Ok(multipart) => FormFields::collect(multipart).await,
        Err(e) => Err(Word2HtmlError::InvalidRequest(e.body_text())),
    };
    let form = match form {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected download: {}", e);
            return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response();
        }
    };
    let Some(html) = form.value("html") else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "缺少html字段").into_response();
    };

    let filename = sanitize_filename(form.value("filename").unwrap_or(DEFAULT_DOWNLOAD_NAME));
    let disposition = match HeaderValue::from_str(&content_disposition(&filename)) {
        Ok(value) => value,
        Err(e) => {
            error!("Bad Content-Disposition for {:?}: {}", filename, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "下载失败").into_response();
        }
    };

    info!("Word download: {} ({} chars)", filename, html.chars().count());
    let body = normalize::prepare_for_word(html);
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/msword")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Drop path components and characters that cannot appear in a header.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A");
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

fn log_failure(endpoint: &str, e: &Word2HtmlError) {
    if e.is_input_error() {
        warn!("{} rejected: {}", endpoint, e);
    } else {
        error!("{} failed: {}", endpoint, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_loses_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\docs\报告.doc"), "报告.doc");
    }

    #[test]
    fn blank_filename_falls_back() {
        assert_eq!(sanitize_filename("   "), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(sanitize_filename("dir/"), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(sanitize_filename(".."), DEFAULT_DOWNLOAD_NAME);
    }

    #[test]
    fn quotes_and_controls_are_removed() {
        assert_eq!(sanitize_filename("a\"b\r\n.doc"), "ab.doc");
    }

    #[test]
    fn disposition_for_ascii_name() {
        assert_eq!(
            content_disposition("my report.doc"),
            "attachment; filename=\"my report.doc\"; filename*=UTF-8''my%20report.doc"
        );
    }

    #[test]
    fn disposition_for_chinese_name() {
        let value = content_disposition("报告.doc");
        assert!(value.starts_with("attachment; filename=\"__.doc\""));
        assert!(value.ends_with("filename*=UTF-8''%E6%8A%A5%E5%91%8A.doc"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
