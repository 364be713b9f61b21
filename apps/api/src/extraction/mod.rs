// Extraction: uploaded bytes -> one normalized line of text.
// .docx is read structurally; .pdf always goes through OCR.
// Both paths block, so callers run them inside tokio::task::spawn_blocking.

pub mod docx;
pub mod normalize;
pub mod ocr;

use bytes::Bytes;
use thiserror::Error;

pub use normalize::normalize_text;
pub use ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    InvalidDocument(String),

    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} {message}")]
    Tool { tool: String, message: String },
}

/// Declared type of an uploaded file, taken from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Case-insensitive match on `.docx` / `.pdf`; anything else is unsupported.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".docx") {
            Some(DocumentKind::Docx)
        } else if lower.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else {
            None
        }
    }
}

/// Uploaded bytes plus their declared kind. Dropped once text is extracted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub kind: DocumentKind,
    pub bytes: Bytes,
}

/// Dispatches to the reader for the document's kind.
pub fn extract_text(document: &RawDocument, ocr: &OcrEngine) -> Result<String, ExtractError> {
    match document.kind {
        DocumentKind::Docx => docx::extract_docx_text(&document.bytes),
        DocumentKind::Pdf => ocr.extract_pdf_text(&document.bytes),
    }
}
