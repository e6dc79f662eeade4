//! HTML normalisation: turn cleaned model output into a Word-importable document.
//!
//! Four stages run in a fixed order, each a pure `&str → String` pass:
//!
//! 1. **Completion**: wrap bare fragments in a full HTML skeleton
//! 2. **Body style**: give an unstyled `<body>` a default serif font
//! 3. **Table style**: force collapsed borders and full width on every table
//! 4. **Validation**: structural checks, reported but never fatal
//!
//! A separate [`prepare_for_word`] pass adds the meta tags Word looks for
//! when a `.doc` download is produced.

use crate::error::ValidationIssue;
use crate::output::NormalizedDocument;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Inline style given to an unstyled `<body>`.
pub const DEFAULT_BODY_STYLE: &str = "font-family: SimSun, serif; font-size: 12pt; line-height: 1.5;";

/// Declarations appended to every `<table>`.
pub const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%;";

/// Meta tags Word uses to recognise an HTML file as one of its own.
pub const WORD_META_TAGS: [&str; 3] = [
    "<meta name=ProgId content=Word.Document>",
    r#"<meta name=Generator content="Microsoft Word 15">"#,
    r#"<meta name=Originator content="Microsoft Word 15">"#,
];

/// Run all four stages over `raw`.
pub fn normalize(raw: &str) -> NormalizedDocument {
    let html = ensure_complete_html(raw);
    let html = apply_default_body_style(&html);
    let html = style_tables(&html);
    let issues = validate(&html);
    NormalizedDocument {
        html,
        valid: issues.is_empty(),
        errors: issues.iter().map(ToString::to_string).collect(),
    }
}

// ── Stage 1: Completion ─────────────────────────────────────────────────────

fn skeleton(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>转换后的文档</title>
</head>
<body>
{body}
</body>
</html>"#
    )
}

/// Strip leftover fence markers and wrap fragments in a full document.
///
/// Text that already starts with `<!doctype` or `<html` (case-insensitive)
/// is returned trimmed but otherwise unchanged.
pub fn ensure_complete_html(raw: &str) -> String {
    let stripped = raw.replace("```html", "").replace("```", "");
    let trimmed = stripped.trim();
    if starts_with_ignore_case(trimmed, "<!doctype") || starts_with_ignore_case(trimmed, "<html") {
        trimmed.to_string()
    } else {
        skeleton(trimmed)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

// ── Stage 2: Default body style ─────────────────────────────────────────────

static RE_BODY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body([^>]*)>").unwrap());
static RE_STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sstyle\s*=").unwrap());

/// Give the first `<body>` tag a default inline style if it has none.
pub fn apply_default_body_style(html: &str) -> String {
    RE_BODY_OPEN
        .replace(html, |caps: &Captures| {
            let attrs = &caps[1];
            if RE_STYLE_ATTR.is_match(attrs) {
                caps[0].to_string()
            } else {
                format!(r#"<body{attrs} style="{DEFAULT_BODY_STYLE}">"#)
            }
        })
        .into_owned()
}

// ── Stage 3: Table style ────────────────────────────────────────────────────

static RE_TABLE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(table)(\s[^>]*)?>").unwrap());
static RE_QUOTED_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Append [`TABLE_STYLE`] to every `<table>` tag.
///
/// Tags without a quoted `style` attribute gain one; an existing quoted
/// `style` has the declarations appended so they win over earlier ones.
/// Tags already carrying the declarations are left alone.
pub fn style_tables(html: &str) -> String {
    RE_TABLE_OPEN
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[1];
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            if attrs.contains(TABLE_STYLE) {
                return caps[0].to_string();
            }
            match RE_QUOTED_STYLE.captures(attrs) {
                Some(style) => {
                    let (quote, value) = match style.get(2) {
                        Some(v) => ('"', v.as_str()),
                        None => ('\'', style.get(3).map_or("", |v| v.as_str())),
                    };
                    let value = value.trim_end();
                    let sep = if value.is_empty() || value.ends_with(';') { "" } else { ";" };
                    let whole = style.get(0).map_or(0..0, |m| m.range());
                    format!(
                        "<{tag}{}{}{quote}{value}{sep} {TABLE_STYLE}{quote}{}>",
                        &attrs[..whole.start],
                        &style[1],
                        &attrs[whole.end..]
                    )
                }
                None => {
                    let attrs = attrs.trim_end_matches('/');
                    format!(r#"<{tag}{attrs} style="{TABLE_STYLE}">"#)
                }
            }
        })
        .into_owned()
}

// ── Stage 4: Validation ─────────────────────────────────────────────────────

static RE_HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[\s>/]").unwrap());
static RE_BODY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body[\s>/]").unwrap());
static RE_HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head[\s>/]").unwrap());
static RE_TABLE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<table[\s>/]").unwrap());
static RE_TABLE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</table\s*>").unwrap());
static RE_ROW_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<tr[\s>/]").unwrap());
static RE_ROW_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</tr\s*>").unwrap());

/// Structural checks, in a fixed order. Never mutates, never fails.
pub fn validate(html: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !RE_HTML_OPEN.is_match(html) {
        issues.push(ValidationIssue::MissingHtml);
    }
    if !RE_BODY_TAG.is_match(html) {
        issues.push(ValidationIssue::MissingBody);
    }
    if !RE_HEAD_OPEN.is_match(html) {
        issues.push(ValidationIssue::MissingHead);
    }
    if RE_TABLE_START.find_iter(html).count() != RE_TABLE_END.find_iter(html).count() {
        issues.push(ValidationIssue::UnbalancedTable);
    }
    if RE_ROW_START.find_iter(html).count() != RE_ROW_END.find_iter(html).count() {
        issues.push(ValidationIssue::UnbalancedRow);
    }
    issues
}

// ── Word export ─────────────────────────────────────────────────────────────

static RE_HEAD_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").unwrap());

/// Insert [`WORD_META_TAGS`] right after the first `<head>` tag.
///
/// Documents without a head are returned unchanged.
pub fn prepare_for_word(html: &str) -> String {
    RE_HEAD_TAG
        .replace(html, |caps: &Captures| {
            let mut out = caps[0].to_string();
            for tag in WORD_META_TAGS {
                out.push_str("\n    ");
                out.push_str(tag);
            }
            out
        })
        .into_owned()
}
