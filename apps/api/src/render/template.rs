//! Placeholder merge for .docx templates.
//!
//! Placeholders are `{{ NAME }}` anywhere in the body, headers or footers.
//! Word often splits a placeholder across several runs, so those are stitched
//! back into one run before substitution.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::render::RenderError;

const DOCUMENT_PART: &str = "word/document.xml";

/// `{{ ... }}`, allowing run markup between the two braces of either delimiter.
static SPLIT_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{(?:<[^>]*>)*\{.*?\}(?:<[^>]*>)*\}").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Renders `template` (bytes of a .docx) with `context`, returning the new
/// archive. Unknown placeholders render empty. Blocking.
pub fn fill_template(
    template: &[u8],
    context: &HashMap<String, String>,
) -> Result<Vec<u8>, RenderError> {
    let mut archive = ZipArchive::new(Cursor::new(template))
        .map_err(|e| RenderError::InvalidTemplate(format!("not a .docx archive: {e}")))?;
    if archive.by_name(DOCUMENT_PART).is_err() {
        return Err(RenderError::InvalidTemplate(format!(
            "missing {DOCUMENT_PART}"
        )));
    }

    let mut out = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| RenderError::InvalidTemplate(format!("unreadable entry {index}: {e}")))?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            out.add_directory(name, options)?;
            continue;
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        if is_text_part(&name) {
            let xml = String::from_utf8(data)
                .map_err(|e| RenderError::InvalidTemplate(format!("{name} is not UTF-8: {e}")))?;
            data = fill_placeholders(&xml, context).into_bytes();
        }

        out.start_file(name, options)?;
        out.write_all(&data)?;
    }

    Ok(out.finish()?.into_inner())
}

fn is_text_part(name: &str) -> bool {
    name == DOCUMENT_PART
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// Substitutes placeholders in one WordprocessingML part.
pub fn fill_placeholders(xml: &str, context: &HashMap<String, String>) -> String {
    let stitched = stitch_split_placeholders(xml);
    let filled = PLACEHOLDER_RE.replace_all(&stitched, |caps: &Captures| {
        context
            .get(&caps[1])
            .map(|value| to_run_text(value))
            .unwrap_or_default()
    });
    // Leading indentation in multi-line values must survive.
    filled.replace("<w:t>", r#"<w:t xml:space="preserve">"#)
}

/// Drops markup between `{{` and `}}` when both sit in the same paragraph.
fn stitch_split_placeholders(xml: &str) -> String {
    SPLIT_PLACEHOLDER_RE
        .replace_all(xml, |caps: &Captures| {
            let span = &caps[0];
            if span.contains('<') && !span.contains("</w:p>") {
                TAG_RE.replace_all(span, "").into_owned()
            } else {
                span.to_string()
            }
        })
        .into_owned()
}

/// XML-escapes a value and turns its line breaks into `<w:br/>`.
fn to_run_text(value: &str) -> String {
    value
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| quick_xml::escape::escape(line).into_owned())
        .collect::<Vec<_>>()
        .join(r#"</w:t><w:br/><w:t xml:space="preserve">"#)
}
