//! Text decoding for plain-text uploads.
//!
//! Uploads from Chinese-locale editors are frequently not UTF-8, so decoding
//! walks a fixed list of candidate encodings and keeps the first one that
//! decodes without a single malformed sequence. The last candidate is a
//! single-byte encoding that accepts any input, and a lossy UTF-8 pass backs
//! everything up, so decoding never fails.

use encoding_rs::{Encoding, GB18030, GBK, UTF_8, WINDOWS_1252};
use tracing::debug;

/// Candidate encodings in the order they are tried.
///
/// `gb2312` is served by the GBK decoder, which is a strict superset of it.
/// `latin-1` is served by windows-1252, which maps every byte.
pub fn candidates() -> [(&'static str, &'static Encoding); 5] {
    [
        ("utf-8", UTF_8),
        ("gbk", GBK),
        ("gb2312", GBK),
        ("gb18030", GB18030),
        ("latin-1", WINDOWS_1252),
    ]
}

/// Text recovered from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Label of the candidate that succeeded, or `utf-8` for the lossy pass.
    pub encoding: &'static str,
    /// True when invalid sequences had to be dropped.
    pub lossy: bool,
}

/// Decode `bytes` using the first candidate encoding that accepts them.
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    for (label, encoding) in candidates() {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) {
            debug!("Decoded {} bytes as {}", bytes.len(), label);
            return DecodedText {
                text: text.into_owned(),
                encoding: label,
                lossy: false,
            };
        }
    }

    // Unreachable while a single-byte candidate is last in the list.
    let text = String::from_utf8_lossy(body).replace('\u{FFFD}', "");
    DecodedText {
        text,
        encoding: "utf-8",
        lossy: true,
    }
}
