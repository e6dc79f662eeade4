//! Post-processing: deterministic cleanup of model-generated HTML.
//!
//! Even when told not to, chat models wrap HTML in ` ```html ` fences, leak
//! `<think>` reasoning blocks, or emit stray control characters that Word
//! refuses to import. These rules strip those artefacts without touching the
//! markup itself.
//!
//! ## Rule Order
//!
//! Fences go first so a fenced reasoning block is still matched as a whole,
//! reasoning blocks go before control characters, and trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Strip code-fence markers (leading language fences, bare fences,
///    trailing fences, fences glued to text)
/// 2. Remove `<think>…</think>` blocks
/// 3. Remove ASCII control characters other than `\t`, `\n`, `\r`
/// 4. Trim surrounding whitespace
pub fn clean_html_response(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = remove_think_blocks(&s);
    let s = remove_control_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip code fences ───────────────────────────────────────────────

static RE_FENCE_OPEN_LANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```html?\s*\n").unwrap());
static RE_FENCE_OPEN_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```\s*\n").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\n```\s*$").unwrap());
static RE_FENCE_GLUED_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```\b").unwrap());
static RE_FENCE_GLUED_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\b```$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let s = RE_FENCE_OPEN_LANG.replace_all(input, "");
    let s = RE_FENCE_OPEN_BARE.replace_all(&s, "");
    let s = RE_FENCE_CLOSE.replace_all(&s, "");
    let s = RE_FENCE_GLUED_START.replace_all(&s, "");
    RE_FENCE_GLUED_END.replace_all(&s, "").into_owned()
}

// ── Rule 2: Remove reasoning blocks ─────────────────────────────────────────

static RE_THINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

fn remove_think_blocks(input: &str) -> String {
    RE_THINK.replace_all(input, "").into_owned()
}

// ── Rule 3: Remove control characters ───────────────────────────────────────

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap());

fn remove_control_chars(input: &str) -> String {
    RE_CONTROL.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_fence() {
        assert_eq!(clean_html_response("```html\n<p>hi</p>\n```"), "<p>hi</p>");
    }

    #[test]
    fn test_strip_htm_and_bare_fences() {
        assert_eq!(clean_html_response("```htm\n<p>a</p>\n```"), "<p>a</p>");
        assert_eq!(clean_html_response("```\n<p>a</p>\n```\n"), "<p>a</p>");
    }

    #[test]
    fn test_fence_after_preamble() {
        let input = "好的，以下是排版结果：\n```html\n<h1>标题</h1>\n```";
        assert_eq!(
            clean_html_response(input),
            "好的，以下是排版结果：\n<h1>标题</h1>"
        );
    }

    #[test]
    fn test_glued_fences() {
        assert_eq!(strip_code_fences("```html<p>x</p>"), "html<p>x</p>");
        assert_eq!(strip_code_fences("<p>x</p>end```"), "<p>x</p>end");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let html = "<!DOCTYPE html>\n<html><body><p>x</p></body></html>";
        assert_eq!(clean_html_response(html), html);
    }

    #[test]
    fn test_think_block_removed() {
        assert_eq!(clean_html_response("<think>x</think><p>y</p>"), "<p>y</p>");
    }

    #[test]
    fn test_multiline_think_blocks_are_lazy() {
        let input = "<think>\nplan\n</think><p>a</p><think>more</think><p>b</p>";
        assert_eq!(clean_html_response(input), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_think_inside_fence() {
        let input = "```html\n<think>hmm</think>\n<p>ok</p>\n```";
        assert_eq!(clean_html_response(input), "<p>ok</p>");
    }

    #[test]
    fn test_control_chars_removed_but_whitespace_kept() {
        let input = "<p>a\u{0}b\u{7}c\u{1b}d\u{7f}</p>\n\t<p>e\r\n</p>";
        assert_eq!(clean_html_response(input), "<p>abcd</p>\n\t<p>e\r\n</p>");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(clean_html_response("  \n<p>x</p>\n\n  "), "<p>x</p>");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_html_response(""), "");
        assert_eq!(clean_html_response("<think>only thoughts</think>"), "");
    }
}
