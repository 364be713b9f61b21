use crate::config::Config;
use crate::extraction::OcrEngine;
use crate::render::CvRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Rasterizer + OCR executables used for every PDF upload.
    pub ocr: OcrEngine,
    pub renderer: CvRenderer,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            ocr: OcrEngine::from_config(&config),
            renderer: CvRenderer::from_config(&config),
            config,
        }
    }
}
