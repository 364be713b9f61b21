use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed numeric values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Fixed CV template the renderer merges fields into.
    pub template_path: PathBuf,
    /// Generated CVs accumulate here, keyed by candidate name.
    pub output_dir: PathBuf,
    pub pdftoppm_path: String,
    pub tesseract_path: String,
    pub ocr_dpi: u32,
    pub ocr_lang: String,
    pub max_upload_bytes: usize,
    /// `None` means any origin is allowed.
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8000)?,
            rust_log: env_or("RUST_LOG", "info"),
            template_path: PathBuf::from(env_or("TEMPLATE_PATH", "templates/cv_template.docx")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "generated_cvs")),
            pdftoppm_path: env_or("PDFTOPPM_PATH", "pdftoppm"),
            tesseract_path: env_or("TESSERACT_PATH", "tesseract"),
            ocr_dpi: parse_env("OCR_DPI", 200)?,
            ocr_lang: env_or("OCR_LANG", "eng"),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            cors_allowed_origins: parse_origins(&env_or("CORS_ALLOWED_ORIGINS", "*")),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}
