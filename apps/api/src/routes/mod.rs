pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::compile::handlers as compile;
use crate::extract::handlers as extract;
use crate::render::handlers as render;
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the upload ceiling.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    // Oversize uploads must reach the validator so they surface as PAYLOAD_TOO_LARGE
    // rather than a bare 413 from the body extractor.
    let body_limit = state
        .intake
        .max_upload_bytes()
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health::health_handler))
        // Extraction
        .route(
            "/api/v1/resume/extract-text",
            post(extract::handle_extract_text),
        )
        // Rendering and compilation
        .route("/api/v1/render/latex", post(render::handle_render_latex))
        .route("/api/v1/render/pdf", post(render::handle_render_pdf))
        .route("/api/v1/convert/latex", post(compile::handle_convert_latex))
        // AI analysis
        .route("/api/v1/analyze", post(analysis::handle_analyze))
        .route("/api/v1/analyze/job", post(analysis::handle_analyze_job))
        .route(
            "/api/v1/resume/suggest-improvements",
            post(analysis::handle_suggest_improvements),
        )
        .route(
            "/api/v1/resume/apply-improvements",
            post(analysis::handle_apply_improvements),
        )
        .route("/api/v1/resume/analyze", post(analysis::handle_review_resume))
        .route("/api/v1/resume/match", post(analysis::handle_match_job))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
