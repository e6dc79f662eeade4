//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_word2html::pipeline::llm::{ChatBackend, ChatRequest, DeltaStream};
use edgequake_word2html::{Relay, RelayOptions, Word2HtmlError};
use futures::stream;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// What a [`ScriptedBackend`] does when called.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these deltas (`None` = chunk without content); batch returns
    /// their concatenation.
    Chunks(Vec<Option<&'static str>>),
    /// Fail before any chunk arrives.
    Reject { status: u16, message: &'static str },
    /// Stream these deltas, then break off.
    BreakAfter(Vec<&'static str>),
}

/// In-memory [`ChatBackend`] that records every request it receives.
pub struct ScriptedBackend {
    script: Script,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn reject(status: u16, message: &str) -> Word2HtmlError {
        Word2HtmlError::Upstream {
            status: Some(status),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, Word2HtmlError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Chunks(deltas) => Ok(deltas.iter().flatten().copied().collect()),
            Script::Reject { status, message } => Err(Self::reject(*status, message)),
            Script::BreakAfter(_) => Err(Word2HtmlError::UpstreamNetwork("connection reset".into())),
        }
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<DeltaStream, Word2HtmlError> {
        self.requests.lock().unwrap().push(request.clone());
        let items: Vec<Result<Option<String>, Word2HtmlError>> = match &self.script {
            Script::Chunks(deltas) => deltas.iter().map(|d| Ok(d.map(str::to_string))).collect(),
            Script::Reject { status, message } => return Err(Self::reject(*status, message)),
            Script::BreakAfter(deltas) => deltas
                .iter()
                .map(|d| Ok(Some(d.to_string())))
                .chain(std::iter::once(Err(Word2HtmlError::UpstreamNetwork(
                    "connection reset".into(),
                ))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Relay over `backend` with default options.
pub fn relay_with(backend: Arc<ScriptedBackend>) -> Relay {
    Relay::new(backend, RelayOptions::default())
}

/// A minimal `.docx` whose body is `body_xml` (the inside of `<w:body>`).
pub fn docx_bytes(body_xml: &str) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
    );
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
            .unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

/// `<w:p>` with one run per item.
pub fn paragraph(runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .map(|t| format!(r#"<w:r><w:t xml:space="preserve">{t}</w:t></w:r>"#))
        .collect();
    format!("<w:p>{runs}</w:p>")
}
