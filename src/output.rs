//! Result and wire types shared by the library, the HTTP surface and the CLI.

use crate::prompts::DEFAULT_RULES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A formatting request: the text to lay out plus free-form rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRequest {
    pub text: String,
    #[serde(default = "default_rules")]
    pub rules: String,
}

fn default_rules() -> String {
    DEFAULT_RULES.to_string()
}

/// Final HTML plus the outcome of structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub html: String,
    pub valid: bool,
    /// One message per failed check, in check order.
    pub errors: Vec<String>,
}

/// What one relay call produced before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutput {
    /// Cleaned model output.
    pub html: String,
    /// Path of the persisted response, or the console sentinel.
    pub log_file: String,
}

/// A normalised document together with where its raw response was logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDocument {
    pub document: NormalizedDocument,
    pub log_file: String,
}

/// Body of `/format/text` and `/format/file` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl FormatResponse {
    pub fn success(doc: NormalizedDocument) -> Self {
        Self {
            success: true,
            message: crate::progress::MSG_FORMAT_COMPLETE.to_string(),
            html: Some(doc.html),
            valid: Some(doc.valid),
            errors: Some(doc.errors),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            html: None,
            valid: None,
            errors: None,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: BTreeMap<String, String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        let services = [("llm", "ready"), ("html_processor", "ready")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rules_default_when_absent() {
        let req: FormatRequest = serde_json::from_str(r#"{"text":"正文"}"#).unwrap();
        assert_eq!(req.rules, DEFAULT_RULES);
    }

    #[test]
    fn request_without_text_is_rejected() {
        assert!(serde_json::from_str::<FormatRequest>(r#"{"rules":"x"}"#).is_err());
    }

    #[test]
    fn failure_omits_document_fields() {
        let v = serde_json::to_value(FormatResponse::failure("请输入文本或上传文件")).unwrap();
        assert_eq!(v["success"], false);
        assert!(v.get("html").is_none());
        assert!(v.get("valid").is_none());
    }

    #[test]
    fn success_carries_validation() {
        let resp = FormatResponse::success(NormalizedDocument {
            html: "<html></html>".into(),
            valid: false,
            errors: vec!["缺少<body>标签".into()],
        });
        assert!(resp.success);
        assert_eq!(resp.valid, Some(false));
        assert_eq!(resp.errors.as_deref(), Some(&["缺少<body>标签".to_string()][..]));
    }

    #[test]
    fn health_lists_services() {
        let h = HealthResponse::healthy();
        assert_eq!(h.status, "healthy");
        assert_eq!(h.services.get("llm").map(String::as_str), Some("ready"));
        assert_eq!(h.services.len(), 2);
    }
}
