use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Pipeline stage that produced a [`DocumentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Extraction,
    Rendering,
    Compilation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Intake => "intake",
            Stage::Extraction => "extraction",
            Stage::Rendering => "rendering",
            Stage::Compilation => "compilation",
        };
        f.write_str(name)
    }
}

/// Typed failures of the document pipeline.
///
/// Every variant carries enough context (filename, template id, compiler log)
/// for the caller to react without re-running anything.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ── Intake ────────────────────────────────────────────────────────────
    #[error("'{filename}': unsupported file type ({detected})")]
    UnsupportedFormat { filename: String, detected: String },

    #[error("'{filename}': {size} bytes exceeds the {limit} byte upload limit")]
    PayloadTooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    #[error("'{filename}': corrupt file: {reason}")]
    CorruptFile { filename: String, reason: String },

    // ── Extraction ────────────────────────────────────────────────────────
    #[error("'{filename}': text extraction failed: {reason}")]
    ExtractionFailed { filename: String, reason: String },

    #[error("'{filename}': text is not valid UTF-8: {reason}")]
    EncodingError { filename: String, reason: String },

    // ── Rendering ─────────────────────────────────────────────────────────
    #[error("unknown template '{id}' (available: modern, classic, minimal, academic)")]
    TemplateNotFound { id: String },

    #[error("template '{template}': {reason}")]
    RenderError { template: String, reason: String },

    // ── Compilation ───────────────────────────────────────────────────────
    #[error("LaTeX compilation timed out after {secs}s")]
    CompileTimeout { secs: u64 },

    #[error("LaTeX compilation failed (exit code {exit_code:?})")]
    CompileError { exit_code: Option<i32>, log: String },

    #[error("compiler reported success but produced no PDF: {reason}")]
    OutputMissing { reason: String, log: String },

    #[error("could not launch LaTeX compiler '{program}': {source}")]
    CompilerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compile workspace I/O failed: {source}")]
    Workspace {
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// The stage that produced this failure.
    pub fn stage(&self) -> Stage {
        match self {
            DocumentError::UnsupportedFormat { .. }
            | DocumentError::PayloadTooLarge { .. }
            | DocumentError::CorruptFile { .. } => Stage::Intake,
            DocumentError::ExtractionFailed { .. } | DocumentError::EncodingError { .. } => {
                Stage::Extraction
            }
            DocumentError::TemplateNotFound { .. } | DocumentError::RenderError { .. } => {
                Stage::Rendering
            }
            DocumentError::CompileTimeout { .. }
            | DocumentError::CompileError { .. }
            | DocumentError::OutputMissing { .. }
            | DocumentError::CompilerLaunch { .. }
            | DocumentError::Workspace { .. } => Stage::Compilation,
        }
    }

    /// Compiler log attached to the failure, if any.
    pub fn compiler_log(&self) -> Option<&str> {
        match self {
            DocumentError::CompileError { log, .. } | DocumentError::OutputMissing { log, .. } => {
                Some(log)
            }
            _ => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            DocumentError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DocumentError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            DocumentError::CorruptFile { .. } => "CORRUPT_FILE",
            DocumentError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            DocumentError::EncodingError { .. } => "ENCODING_ERROR",
            DocumentError::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            DocumentError::RenderError { .. } => "RENDER_ERROR",
            DocumentError::CompileTimeout { .. } => "COMPILE_TIMEOUT",
            DocumentError::CompileError { .. } => "COMPILE_ERROR",
            DocumentError::OutputMissing { .. } => "OUTPUT_MISSING",
            DocumentError::CompilerLaunch { .. } => "COMPILER_UNAVAILABLE",
            DocumentError::Workspace { .. } => "COMPILE_WORKSPACE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DocumentError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DocumentError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DocumentError::CorruptFile { .. } | DocumentError::TemplateNotFound { .. } => {
                StatusCode::BAD_REQUEST
            }
            DocumentError::ExtractionFailed { .. }
            | DocumentError::EncodingError { .. }
            | DocumentError::RenderError { .. }
            | DocumentError::CompileError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DocumentError::CompileTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            DocumentError::CompilerLaunch { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DocumentError::OutputMissing { .. } | DocumentError::Workspace { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("AI provider is not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Document(err) = &self {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!("{} stage failed: {err}", err.stage());
            } else {
                tracing::warn!("{} stage rejected request: {err}", err.stage());
            }

            let mut body = json!({
                "code": err.code(),
                "message": err.to_string(),
                "stage": err.stage(),
            });
            if let Some(log) = err.compiler_log() {
                body["log"] = json!(log);
            }
            return (status, Json(json!({ "error": body }))).into_response();
        }

        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::ProviderNotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROVIDER_NOT_CONFIGURED",
                msg.clone(),
            ),
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Document(_) => unreachable!("handled above"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
