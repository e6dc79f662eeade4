//! Multipart form collection.
//!
//! Every endpoint that takes a form reads it fully into a [`FormFields`]
//! before doing any work. Forms are small (one optional upload plus a few
//! short text fields) and the body limit already caps their size.

use crate::error::Word2HtmlError;
use crate::prompts::DEFAULT_RULES;
use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

/// Name of the upload field.
pub const FILE_FIELD: &str = "file";

/// An uploaded file with the name the client declared for it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// All fields of one multipart form.
#[derive(Debug, Default)]
pub struct FormFields {
    pub file: Option<UploadedFile>,
    values: HashMap<String, String>,
}

impl FormFields {
    /// Drain `multipart` into memory.
    ///
    /// A `file` part without a filename (browsers send one when the picker
    /// was left empty) counts as no file.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, Word2HtmlError> {
        let mut fields = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .file_name()
                .map(str::to_string)
                .filter(|f| !f.is_empty());

            if name == FILE_FIELD {
                let bytes = field.bytes().await.map_err(invalid)?;
                if let Some(filename) = filename {
                    debug!("Received upload {} ({} bytes)", filename, bytes.len());
                    fields.file = Some(UploadedFile { filename, bytes });
                }
                continue;
            }

            let value = field.text().await.map_err(invalid)?;
            fields.values.insert(name, value);
        }
        Ok(fields)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The `rules` field, or the default rules when the form has none.
    pub fn rules(&self) -> String {
        self.value("rules").unwrap_or(DEFAULT_RULES).to_string()
    }
}

fn invalid(e: axum::extract::multipart::MultipartError) -> Word2HtmlError {
    Word2HtmlError::InvalidRequest(e.body_text())
}
