//! OCR pipeline for PDF uploads.
//!
//! Every page is rasterized with `pdftoppm` and read back with `tesseract`,
//! even when the PDF carries a text layer.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::Config;
use crate::extraction::{normalize_text, ExtractError};

/// Page prefix passed to `pdftoppm`; pages land as `page-<n>.png`.
const PAGE_PREFIX: &str = "page";
/// LSTM engine, single column of variable-size text.
const TESSERACT_OEM: &str = "3";
const TESSERACT_PSM: &str = "4";

/// External rasterizer + OCR engine pair.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    pub pdftoppm_path: String,
    pub tesseract_path: String,
    pub dpi: u32,
    pub lang: String,
}

impl OcrEngine {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pdftoppm_path: config.pdftoppm_path.clone(),
            tesseract_path: config.tesseract_path.clone(),
            dpi: config.ocr_dpi,
            lang: config.ocr_lang.clone(),
        }
    }

    /// Rasterizes and OCRs every page, keeping page order. Blocking.
    pub fn extract_pdf_text(&self, pdf: &[u8]) -> Result<String, ExtractError> {
        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let pages = self.rasterize(&pdf_path, workdir.path())?;
        info!(pages = pages.len(), "PDF rasterized for OCR");

        let mut page_texts = Vec::with_capacity(pages.len());
        for (index, image) in pages.iter().enumerate() {
            let text = self.recognize(image)?;
            debug!(page = index + 1, chars = text.len(), "OCR page done");
            page_texts.push(text);
        }

        Ok(join_pages(&page_texts))
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        let output = Command::new(&self.pdftoppm_path)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .map_err(|e| tool_error(&self.pdftoppm_path, format!("failed to start: {e}")))?;

        if !output.status.success() {
            return Err(tool_error(
                &self.pdftoppm_path,
                format!(
                    "exit {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(out_dir)? {
            names.push(entry?.path());
        }
        let pages = order_page_images(names);
        if pages.is_empty() {
            return Err(tool_error(&self.pdftoppm_path, "produced no page images".into()));
        }
        Ok(pages)
    }

    fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.tesseract_path)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--oem")
            .arg(TESSERACT_OEM)
            .arg("--psm")
            .arg(TESSERACT_PSM)
            .output()
            .map_err(|e| tool_error(&self.tesseract_path, format!("failed to start: {e}")))?;

        if !output.status.success() {
            return Err(tool_error(
                &self.tesseract_path,
                format!(
                    "exit {} on {}: {}",
                    output.status.code().unwrap_or(-1),
                    image.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn tool_error(tool: &str, message: String) -> ExtractError {
    ExtractError::Tool {
        tool: tool.to_string(),
        message,
    }
}

/// Keeps `page-<n>.png` files and sorts them by page number.
///
/// `pdftoppm` zero-pads the page number to the width of the page count, so
/// the number is parsed rather than compared as text.
fn order_page_images(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut pages: Vec<(u32, PathBuf)> = paths
        .into_iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            let number = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?.parse().ok()?;
            is_png.then_some((number, path))
        })
        .collect();
    pages.sort_by_key(|(number, _)| *number);
    pages.into_iter().map(|(_, path)| path).collect()
}

/// Drops blank pages, joins the rest with a space and normalizes.
fn join_pages(page_texts: &[String]) -> String {
    let kept = page_texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&kept)
}
