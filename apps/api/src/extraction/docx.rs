//! Plain-text extraction from Word (.docx) documents.
//!
//! Reads `word/document.xml` and collects body paragraphs and table rows
//! separately: all paragraphs come first, then every row of every top-level
//! table with its non-empty cell texts joined by a single space.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::extraction::{normalize_text, ExtractError};

const DOCUMENT_PART: &str = "word/document.xml";

/// Text content of a document, in source order within each group.
#[derive(Debug, Default, PartialEq)]
pub struct DocxContent {
    pub paragraphs: Vec<String>,
    pub table_rows: Vec<String>,
}

impl DocxContent {
    /// Paragraphs then table rows, joined with single spaces and normalized.
    pub fn to_text(&self) -> String {
        let joined = self
            .paragraphs
            .iter()
            .chain(self.table_rows.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        normalize_text(&joined)
    }
}

/// Extracts normalized text from the bytes of a .docx file.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(read_docx_content(bytes)?.to_text())
}

pub fn read_docx_content(bytes: &[u8]) -> Result<DocxContent, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::InvalidDocument(format!("Invalid DOCX: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::InvalidDocument(format!("Missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

/// Walks the WordprocessingML body.
///
/// Only outermost paragraphs count, so text-box content nested inside a run
/// is not picked up twice. Cells of nested tables are skipped.
fn parse_document_xml(xml: &str) -> Result<DocxContent, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut content = DocxContent::default();
    let mut table_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;
    // One buffer per open <w:p>; text always goes to the innermost.
    let mut paragraphs: Vec<String> = Vec::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut cell_paragraphs: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row_cells.clear(),
                b"w:tc" if table_depth == 1 => cell_paragraphs.clear(),
                b"w:p" => paragraphs.push(String::new()),
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:tr" if table_depth == 1 => {
                    let row = row_cells
                        .iter()
                        .map(|c| c.trim())
                        .filter(|c| !c.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !row.is_empty() {
                        content.table_rows.push(row);
                    }
                }
                b"w:tc" if table_depth == 1 => row_cells.push(cell_paragraphs.join("\n")),
                b"w:p" => {
                    if let Some(text) = paragraphs.pop() {
                        if paragraphs.is_empty() {
                            match table_depth {
                                0 if !text.trim().is_empty() => content.paragraphs.push(text),
                                1 => cell_paragraphs.push(text),
                                _ => {}
                            }
                        }
                    }
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) if run_depth > 0 => {
                let ch = match e.name().as_ref() {
                    b"w:tab" => Some('\t'),
                    b"w:br" | b"w:cr" => Some('\n'),
                    _ => None,
                };
                if let (Some(ch), Some(current)) = (ch, paragraphs.last_mut()) {
                    current.push(ch);
                }
            }
            Ok(Event::Text(e)) if in_text => {
                if let Some(current) = paragraphs.last_mut() {
                    current.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                if let (Some(ch), Some(current)) =
                    (resolve_entity(e.as_ref()), paragraphs.last_mut())
                {
                    current.push(ch);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Xml {
                    part: DOCUMENT_PART.to_string(),
                    message: e.to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

/// Resolves `&name;` references appearing inside `<w:t>` text.
fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => {
            let name = std::str::from_utf8(name).ok()?;
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds a minimal .docx whose body is `body_xml`.
    pub(crate) fn build_docx(body_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default();
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#,
            )
            .unwrap();
            zip.start_file("word/document.xml", options).unwrap();
            let document = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
            );
            zip.write_all(document.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    pub(crate) fn para(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn table(rows: &[&[&str]]) -> String {
        let rows: String = rows
            .iter()
            .map(|cells| {
                let cells: String = cells
                    .iter()
                    .map(|c| format!("<w:tc>{}</w:tc>", para(c)))
                    .collect();
                format!("<w:tr>{cells}</w:tr>")
            })
            .collect();
        format!("<w:tbl>{rows}</w:tbl>")
    }

    #[test]
    fn test_paragraphs_before_table_rows() {
        // Table sits between the two paragraphs in the source.
        let body = format!(
            "{}{}{}",
            para("Jane Doe"),
            table(&[&["Cell A", "Cell B"]]),
            para("Nationality: British")
        );
        let text = extract_docx_text(&build_docx(&body)).unwrap();
        assert!(
            text.contains("Jane Doe Nationality: British Cell A Cell B"),
            "{text}"
        );
    }

    #[test]
    fn test_empty_paragraphs_and_cells_are_skipped() {
        let body = format!(
            "{}{}{}{}",
            para("First"),
            para("   "),
            "<w:p/>",
            table(&[&["", "Only"], &["", ""], &["X", "Y"]])
        );
        let content = read_docx_content(&build_docx(&body)).unwrap();
        assert_eq!(content.paragraphs, vec!["First".to_string()]);
        assert_eq!(content.table_rows, vec!["Only".to_string(), "X Y".to_string()]);
    }

    #[test]
    fn test_runs_tabs_and_breaks() {
        let body = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Jane</w:t></w:r><w:r><w:tab/><w:t>Doe</w:t><w:br/><w:t>London</w:t></w:r></w:p>"#;
        let content = read_docx_content(&build_docx(body)).unwrap();
        assert_eq!(content.paragraphs, vec!["Jane\tDoe\nLondon".to_string()]);
        assert_eq!(content.to_text(), "Jane Doe London");
    }

    #[test]
    fn test_entities_are_resolved() {
        let body = para("R&amp;D &lt;Lead&gt; caf&#233;");
        let content = read_docx_content(&build_docx(&body)).unwrap();
        assert_eq!(content.paragraphs, vec!["R&D <Lead> café".to_string()]);
    }

    #[test]
    fn test_nested_table_cells_are_ignored() {
        let inner = table(&[&["Inner"]]);
        let body = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para("Outer"),
            inner,
            para("Right")
        );
        let content = read_docx_content(&build_docx(&body)).unwrap();
        assert_eq!(content.table_rows, vec!["Outer Right".to_string()]);
    }

    #[test]
    fn test_invalid_bytes_fail() {
        let err = extract_docx_text(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidDocument(_)));
    }

    #[test]
    fn test_zip_without_document_part_fails() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            zip.start_file("readme.txt", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_docx_text(&buffer.into_inner()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidDocument(_)));
    }
}
