//! Plain-text extraction from Word (`.docx`) containers.
//!
//! A `.docx` file is a zip archive whose `word/document.xml` part holds the
//! body. We stream that part with `quick-xml` and keep only what the model
//! needs: body paragraphs in document order, then one line per row of each
//! top-level table with the non-empty cell texts joined by `" | "`.
//!
//! Nested tables and paragraphs inside text boxes contribute nothing. Text
//! boxes live in paragraphs nested inside a run, so only runs of an
//! outermost paragraph are read.

use crate::error::Word2HtmlError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Separator placed between cells of one table row.
pub const CELL_SEPARATOR: &str = " | ";

/// Message used when a container holds no text at all.
pub const NO_TEXT_MESSAGE: &str = "文档中未提取到任何文本内容";

const DOCUMENT_PART: &str = "word/document.xml";

/// Text pulled out of one document body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocxText {
    pub paragraphs: Vec<String>,
    pub table_rows: Vec<String>,
}

impl DocxText {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.table_rows.is_empty()
    }

    /// Paragraphs first, then table rows, one per line.
    pub fn into_text(self) -> String {
        self.paragraphs
            .into_iter()
            .chain(self.table_rows)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extract the text of the `.docx` file at `path`.
///
/// Blocking: call from `spawn_blocking` in async contexts.
pub fn extract_text(path: &Path) -> Result<String, Word2HtmlError> {
    let file = File::open(path)
        .map_err(|e| Word2HtmlError::Extraction(format!("Failed to open DOCX: {e}")))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Word2HtmlError::Extraction(format!("Failed to extract text from DOCX: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| Word2HtmlError::Extraction(format!("Missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| Word2HtmlError::Extraction(format!("Failed to read {DOCUMENT_PART}: {e}")))?;

    let body = parse_document_xml(&xml)?;
    debug!(
        "DOCX body: {} paragraphs, {} table rows",
        body.paragraphs.len(),
        body.table_rows.len()
    );
    if body.is_empty() {
        return Err(Word2HtmlError::Extraction(NO_TEXT_MESSAGE.to_string()));
    }
    Ok(body.into_text())
}

/// Walk a `word/document.xml` part and collect paragraphs and table rows.
pub fn parse_document_xml(xml: &str) -> Result<DocxText, Word2HtmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut walker = BodyWalker::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => walker.open(e.name().as_ref()),
            Ok(Event::End(e)) => walker.close(e.name().as_ref()),
            Ok(Event::Empty(e)) => walker.empty(e.name().as_ref()),
            Ok(Event::Text(e)) => {
                if walker.wants_text() {
                    let text = e.unescape().map_err(|err| {
                        Word2HtmlError::Extraction(format!("Malformed text in {DOCUMENT_PART}: {err}"))
                    })?;
                    walker.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Word2HtmlError::Extraction(format!(
                    "Malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(walker.finish())
}

/// Element-depth state machine over the body.
#[derive(Default)]
struct BodyWalker {
    out: DocxText,
    table_depth: usize,
    para_depth: usize,
    run_depth: usize,
    in_text: bool,
    /// Text of the paragraph being collected, when it is one we keep.
    para: Option<String>,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
}

impl BodyWalker {
    fn open(&mut self, name: &[u8]) {
        match name {
            b"w:tbl" => self.table_depth += 1,
            b"w:tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            b"w:tc" if self.table_depth == 1 => self.cell = Some(Vec::new()),
            b"w:p" => {
                self.para_depth += 1;
                if self.para_depth == 1 && self.table_depth <= 1 {
                    self.para = Some(String::new());
                }
            }
            b"w:r" => self.run_depth += 1,
            b"w:t" if self.run_depth > 0 => self.in_text = true,
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => self.run_depth = self.run_depth.saturating_sub(1),
            b"w:p" => {
                if self.para_depth == 1 {
                    if let Some(text) = self.para.take() {
                        self.finish_paragraph(text);
                    }
                }
                self.para_depth = self.para_depth.saturating_sub(1);
            }
            b"w:tc" if self.table_depth == 1 => {
                if let Some(paragraphs) = self.cell.take() {
                    let text = paragraphs.join("\n");
                    let text = text.trim();
                    if !text.is_empty() {
                        if let Some(row) = self.row.as_mut() {
                            row.push(text.to_string());
                        }
                    }
                }
            }
            b"w:tr" if self.table_depth == 1 => {
                if let Some(cells) = self.row.take() {
                    if !cells.is_empty() {
                        self.out.table_rows.push(cells.join(CELL_SEPARATOR));
                    }
                }
            }
            b"w:tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        if self.run_depth == 0 || self.para_depth != 1 {
            return;
        }
        match name {
            b"w:tab" => self.push_str("\t"),
            b"w:br" | b"w:cr" => self.push_str("\n"),
            _ => {}
        }
    }

    fn wants_text(&self) -> bool {
        self.in_text && self.para_depth == 1 && self.para.is_some()
    }

    fn push_str(&mut self, s: &str) {
        if let Some(para) = self.para.as_mut() {
            para.push_str(s);
        }
    }

    fn finish_paragraph(&mut self, text: String) {
        match self.table_depth {
            0 => {
                if !text.trim().is_empty() {
                    self.out.paragraphs.push(text);
                }
            }
            1 => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.push(text);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> DocxText {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    fn cell(text: &str) -> String {
        format!("<w:tc>{}</w:tc>", para(text))
    }

    #[test]
    fn paragraphs_in_document_order() {
        let xml = doc(&format!("{}{}", para("第一段"), para("第二段")));
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["第一段", "第二段"]);
        assert!(body.table_rows.is_empty());
    }

    #[test]
    fn blank_paragraphs_are_skipped() {
        let xml = doc(&format!("{}<w:p/>{}{}", para("a"), para("   "), para("b")));
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["a", "b"]);
    }

    #[test]
    fn runs_are_concatenated_with_tabs_and_breaks() {
        let xml = doc(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t xml:space="preserve">b </w:t></w:r><w:r><w:br/><w:t>c</w:t></w:r></w:p>"#,
        );
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["a\tb \nc"]);
    }

    #[test]
    fn table_rows_join_non_empty_cells() {
        let table = format!(
            "<w:tbl><w:tr>{}{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>",
            cell("姓名"),
            cell(" "),
            cell("年龄"),
            cell("张三"),
            cell("18")
        );
        let xml = doc(&format!("{}{}", table, para("表后段落")));
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["表后段落"]);
        assert_eq!(body.table_rows, vec!["姓名 | 年龄", "张三 | 18"]);
        assert_eq!(body.into_text(), "表后段落\n姓名 | 年龄\n张三 | 18");
    }

    #[test]
    fn multi_paragraph_cell_joins_with_newline() {
        let table = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            para("上"),
            para("下")
        );
        let body = parse_document_xml(&doc(&table)).unwrap();
        assert_eq!(body.table_rows, vec!["上\n下"]);
    }

    #[test]
    fn nested_tables_are_ignored() {
        let inner = format!("<w:tbl><w:tr>{}</w:tr></w:tbl>", cell("inner"));
        let table = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            para("outer"),
            inner
        );
        let body = parse_document_xml(&doc(&table)).unwrap();
        assert_eq!(body.table_rows, vec!["outer"]);
    }

    #[test]
    fn text_box_content_is_skipped() {
        let box_para = r#"<w:p><w:r><w:t>BOX</w:t><w:br/></w:r></w:p>"#;
        let xml = doc(&format!(
            concat!(
                "<w:p><w:r><w:t>正文</w:t></w:r>",
                "<w:r><mc:AlternateContent>",
                "<mc:Choice Requires=\"wps\"><w:drawing><wps:txbx><w:txbxContent>{b}</w:txbxContent></wps:txbx></w:drawing></mc:Choice>",
                "<mc:Fallback><w:pict><v:textbox><w:txbxContent>{b}</w:txbxContent></v:textbox></w:pict></mc:Fallback>",
                "</mc:AlternateContent><w:t>尾</w:t></w:r></w:p>",
                "{after}"
            ),
            b = box_para,
            after = para("下一段"),
        ));
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["正文尾", "下一段"]);
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = doc(&para("a &amp; b &lt;c&gt;"));
        let body = parse_document_xml(&xml).unwrap();
        assert_eq!(body.paragraphs, vec!["a & b <c>"]);
    }

    #[test]
    fn empty_body_is_empty() {
        let body = parse_document_xml(&doc("")).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn missing_file_is_extraction_error() {
        let err = extract_text(Path::new("/nonexistent/file.docx")).unwrap_err();
        assert!(matches!(err, Word2HtmlError::Extraction(_)));
    }

    #[test]
    fn non_zip_file_is_extraction_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"not a zip archive").unwrap();
        let err = extract_text(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to extract text from DOCX"));
    }
}
