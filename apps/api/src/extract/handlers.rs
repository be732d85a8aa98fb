use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::{AppError, DocumentError};
use crate::extract::{extract, ExtractedDocument};
use crate::intake::ValidatedUpload;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExtractTextResponse {
    pub file: ValidatedUpload,
    #[serde(flatten)]
    pub document: ExtractedDocument,
}

/// POST /api/v1/resume/extract-text
/// Multipart upload with a single `file` field.
pub async fn handle_extract_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractTextResponse>, AppError> {
    let upload = read_file_field(&mut multipart).await?;
    let validator = state.intake;

    // Sniffing and decoding are CPU-bound; keep them off the async executor.
    let response = tokio::task::spawn_blocking(move || {
        let file = validator.validate(&upload.data, &upload.filename, upload.content_type.as_deref())?;
        let document = extract(&upload.data, &file)?;
        Ok::<_, DocumentError>(ExtractTextResponse { file, document })
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))??;

    Ok(Json(response))
}

struct FileField {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<FileField, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;

        return Ok(FileField {
            filename,
            content_type,
            data,
        });
    }

    Err(AppError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}
