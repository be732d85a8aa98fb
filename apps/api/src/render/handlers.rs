use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::render::{render, RenderRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RenderLatexResponse {
    pub latex: String,
    pub style: String,
}

/// POST /api/v1/render/latex
/// Returns the complete LaTeX source without compiling it.
pub async fn handle_render_latex(
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderLatexResponse>, AppError> {
    let latex = render(&request)?;
    Ok(Json(RenderLatexResponse {
        latex,
        style: request.style.trim().to_ascii_lowercase(),
    }))
}

/// POST /api/v1/render/pdf
/// Renders and compiles in one call; the response body is the PDF itself.
pub async fn handle_render_pdf(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, AppError> {
    let latex = render(&request)?;
    let artifact = state.compiler.compile(&latex).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"resume.pdf\""),
        ],
        artifact.pdf,
    )
        .into_response())
}
