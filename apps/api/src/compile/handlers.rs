use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConvertLatexRequest {
    pub latex: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertLatexResponse {
    pub pdf_base64: String,
    pub tex_base64: String,
    pub log: String,
    pub passes: u8,
}

/// POST /api/v1/convert/latex
///
/// Compiles caller-supplied LaTeX. The source is treated as untrusted.
pub async fn handle_convert_latex(
    State(state): State<AppState>,
    Json(request): Json<ConvertLatexRequest>,
) -> Result<Json<ConvertLatexResponse>, AppError> {
    if request.latex.trim().is_empty() {
        return Err(AppError::Validation("latex cannot be empty".to_string()));
    }

    let artifact = state.compiler.compile(&request.latex).await?;

    Ok(Json(ConvertLatexResponse {
        pdf_base64: STANDARD.encode(&artifact.pdf),
        tex_base64: STANDARD.encode(request.latex.as_bytes()),
        log: artifact.log,
        passes: artifact.passes,
    }))
}
