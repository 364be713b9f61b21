// Rendering: field map -> generated .docx in the output directory.
// Files are named after the candidate; a later CV for the same name replaces
// the earlier one.

pub mod template;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;

pub use template::fill_template;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const FALLBACK_STEM: &str = "Candidate";

static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not found at {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render task failed: {0}")]
    Task(String),
}

/// Template location plus output directory.
#[derive(Debug, Clone)]
pub struct CvRenderer {
    template_path: PathBuf,
    output_dir: PathBuf,
}

impl CvRenderer {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.template_path, &config.output_dir)
    }

    /// Merges `context` into the template and writes `<FULL_NAME>.docx`.
    ///
    /// The archive is written to a hidden staging file first and renamed into
    /// place, so downloads never observe a partial file.
    pub async fn render(&self, context: HashMap<String, String>) -> Result<PathBuf, RenderError> {
        let template = match tokio::fs::read(&self.template_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::TemplateMissing(self.template_path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let filename = output_filename(context.get("FULL_NAME").map(String::as_str));
        let rendered = tokio::task::spawn_blocking(move || fill_template(&template, &context))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let final_path = write_staged(&self.output_dir, &filename, &rendered).await?;

        info!(path = %final_path.display(), bytes = rendered.len(), "CV written");
        Ok(final_path)
    }

    /// Path of a previously generated file, or `None` if `filename` is not a
    /// bare visible file name.
    pub fn output_path(&self, filename: &str) -> Option<PathBuf> {
        let bare = Path::new(filename).file_name() == Some(OsStr::new(filename));
        if filename.is_empty() || filename.starts_with('.') || !bare {
            return None;
        }
        Some(self.output_dir.join(filename))
    }
}

/// Writes `bytes` to a hidden staging file in `dir`, then renames it to
/// `filename`. The staging file is removed if either step fails.
async fn write_staged(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let final_path = dir.join(filename);
    let staging = dir.join(format!(".{filename}.{}.tmp", Uuid::new_v4()));

    let result = match tokio::fs::write(&staging, bytes).await {
        Ok(()) => tokio::fs::rename(&staging, &final_path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }
    Ok(final_path)
}

/// Strips everything but word characters, whitespace and hyphens, then
/// replaces whitespace with underscores.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_CHARS_RE
        .replace_all(name, "")
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// `<sanitized name>.docx`, or `Candidate.docx` when nothing usable is left.
pub fn output_filename(full_name: Option<&str>) -> String {
    let stem = sanitize_filename(full_name.unwrap_or_default());
    if stem.is_empty() {
        format!("{FALLBACK_STEM}.docx")
    } else {
        format!("{stem}.docx")
    }
}

#[cfg(test)]
mod tests {
    use super::template::tests::{build_template, read_part};
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_filename("O'Brien Smith!"), "OBrien_Smith");
        assert_eq!(sanitize_filename("Anne-Marie  Curie"), "Anne-Marie__Curie");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn test_output_filename_fallback() {
        assert_eq!(output_filename(Some("O'Brien Smith!")), "OBrien_Smith.docx");
        assert_eq!(output_filename(Some("   ")), "Candidate.docx");
        assert_eq!(output_filename(Some("!!!")), "Candidate.docx");
        assert_eq!(output_filename(None), "Candidate.docx");
    }

    #[test]
    fn test_output_path_rejects_non_bare_names() {
        let renderer = CvRenderer::new("t.docx", "/srv/out");
        assert_eq!(
            renderer.output_path("Jane_Doe.docx"),
            Some(PathBuf::from("/srv/out/Jane_Doe.docx"))
        );
        assert_eq!(renderer.output_path("../secret.docx"), None);
        assert_eq!(renderer.output_path("sub/Jane.docx"), None);
        assert_eq!(renderer.output_path(".."), None);
        assert_eq!(renderer.output_path(".Jane.docx.tmp"), None);
        assert_eq!(renderer.output_path(""), None);
    }

    #[tokio::test]
    async fn test_render_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        std::fs::write(
            &template_path,
            build_template("<w:p><w:r><w:t>{{ FULL_NAME }} / {{ LANGUAGES }}</w:t></w:r></w:p>"),
        )
        .unwrap();
        let out_dir = dir.path().join("out");
        let renderer = CvRenderer::new(&template_path, &out_dir);

        let path = renderer
            .render(ctx(&[("FULL_NAME", "Jane Doe"), ("LANGUAGES", "English, French")]))
            .await
            .unwrap();

        assert_eq!(path, out_dir.join("Jane_Doe.docx"));
        let rendered = std::fs::read(&path).unwrap();
        let document = read_part(&rendered, "word/document.xml");
        assert!(document.contains("Jane Doe / English, French"), "{document}");

        // Only the final file remains; the staging file was renamed away.
        let entries: Vec<_> = std::fs::read_dir(&out_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        std::fs::write(
            &template_path,
            build_template("<w:p><w:r><w:t>{{ LOCATION }}</w:t></w:r></w:p>"),
        )
        .unwrap();
        let renderer = CvRenderer::new(&template_path, dir.path().join("out"));

        let first = renderer
            .render(ctx(&[("FULL_NAME", "Jane Doe"), ("LOCATION", "Leeds")]))
            .await
            .unwrap();
        let second = renderer
            .render(ctx(&[("FULL_NAME", "Jane Doe"), ("LOCATION", "York")]))
            .await
            .unwrap();

        assert_eq!(first, second);
        let document = read_part(&std::fs::read(&second).unwrap(), "word/document.xml");
        assert!(document.contains("York"));
        assert!(!document.contains("Leeds"));
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory squats on the target name, so the rename fails.
        std::fs::create_dir(dir.path().join("Jane_Doe.docx")).unwrap();
        std::fs::write(dir.path().join("Jane_Doe.docx").join("keep"), b"x").unwrap();

        let result = write_staged(dir.path(), "Jane_Doe.docx", b"rendered").await;
        assert!(result.is_err());

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Jane_Doe.docx".to_string()]);
    }

    #[tokio::test]
    async fn test_unwritable_staging_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(write_staged(&missing, "Jane_Doe.docx", b"rendered").await.is_err());
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = CvRenderer::new(dir.path().join("absent.docx"), dir.path().join("out"));
        let err = renderer.render(HashMap::new()).await.unwrap_err();
        assert!(matches!(err, RenderError::TemplateMissing(_)));
    }

    #[tokio::test]
    async fn test_blank_name_falls_back_to_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        std::fs::write(&template_path, build_template("<w:p/>")).unwrap();
        let renderer = CvRenderer::new(&template_path, dir.path().join("out"));
        let path = renderer.render(ctx(&[("FULL_NAME", "")])).await.unwrap();
        assert!(path.ends_with("Candidate.docx"));
    }
}
