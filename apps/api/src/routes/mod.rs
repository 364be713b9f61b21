pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cv::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // CV API
        .route(
            "/upload/",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/parse/", post(handlers::handle_parse))
        .route("/generate-cv/", post(handlers::handle_generate_cv))
        .route("/download-cv/", get(handlers::handle_download_cv))
        .with_state(state)
}
