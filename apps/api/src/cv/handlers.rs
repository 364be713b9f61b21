//! Axum route handlers for the CV API.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::{extract_text, DocumentKind, RawDocument};
use crate::parsing::{parse_fields, FieldMap};
use crate::render::DOCX_MIME;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub extracted_text: String,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub extracted_text: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub output_file: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub filename: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /upload/
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let kind = DocumentKind::from_filename(&filename).ok_or(AppError::UnsupportedFormat)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read upload", e))?;
        info!(%filename, ?kind, size = bytes.len(), "Upload received");

        let document = RawDocument { kind, bytes };
        let ocr = state.ocr.clone();
        let extracted_text = tokio::task::spawn_blocking(move || extract_text(&document, &ocr))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))??;

        info!(%filename, chars = extracted_text.len(), "Text extracted");
        return Ok(Json(UploadResponse { extracted_text }));
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

/// POST /parse/
pub async fn handle_parse(Json(req): Json<ParseRequest>) -> Json<FieldMap> {
    Json(parse_fields(&req.extracted_text))
}

/// POST /generate-cv/
///
/// Parsed fields are merged over the caller's body, so they win on key clashes.
pub async fn handle_generate_cv(
    State(state): State<AppState>,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<Json<GenerateResponse>, AppError> {
    let fields = parse_fields(
        body.get("extracted_text")
            .and_then(Value::as_str)
            .unwrap_or_default(),
    );
    if let Value::Object(parsed) = serde_json::to_value(&fields).map_err(anyhow::Error::from)? {
        body.extend(parsed);
    }

    let context: HashMap<String, String> = body
        .into_iter()
        .map(|(key, value)| (key, value_to_text(value)))
        .collect();

    let path = state.renderer.render(context).await?;
    Ok(Json(GenerateResponse {
        message: "CV generated successfully!".to_string(),
        output_file: path.display().to_string(),
    }))
}

/// GET /download-cv/?filename=<name>
pub async fn handle_download_cv(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("File '{}' not found", query.filename));

    let path = state
        .renderer
        .output_path(&query.filename)
        .ok_or_else(not_found)?;
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(not_found()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.into())),
    }

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let disposition = format!("attachment; filename=\"{}\"", query.filename);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, DOCX_MIME)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {e}")))
}

/// Oversized bodies surface as multipart errors; keep them distinct from
/// malformed ones.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {}", e.body_text()))
    } else {
        AppError::Validation(format!("{context}: {}", e.body_text()))
    }
}

/// Template values are plain text; non-string JSON is rendered as JSON.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
