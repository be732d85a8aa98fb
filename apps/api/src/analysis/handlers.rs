//! Axum route handlers for the Analysis API.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::analysis::{
    analyze_job, apply_improvements, match_resume_to_job, review_resume, run, suggest_improvements,
    AnalysisOutcome, AnalysisRequest, JobAnalysis, JobMatch, PromptTone, ResumeReview, Suggestions,
};
use crate::errors::AppError;
use crate::llm_client::CompletionProvider;
use crate::render::{render, Layout, RenderRequest, ResumeMetadata};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeJobRequest {
    pub job_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestImprovementsRequest {
    pub resume_text: String,
    #[serde(default)]
    pub job_text: String,
    #[serde(default)]
    pub tone: PromptTone,
}

#[derive(Debug, Deserialize)]
pub struct ReviewResumeRequest {
    pub resume_text: String,
    #[serde(default)]
    pub tone: PromptTone,
}

#[derive(Debug, Deserialize)]
pub struct MatchJobRequest {
    pub resume_text: String,
    pub job_text: String,
    #[serde(default)]
    pub tone: PromptTone,
}

#[derive(Debug, Deserialize)]
pub struct ApplyImprovementsRequest {
    pub resume_text: String,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub job_text: String,
    #[serde(default)]
    pub tone: PromptTone,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub metadata: Option<ResumeMetadata>,
}

fn default_style() -> String {
    "modern".to_string()
}

#[derive(Debug, Serialize)]
pub struct ApplyImprovementsResponse {
    /// Rewritten resume as plain text.
    pub text: String,
    /// The rewritten resume rendered with the requested template.
    pub latex: String,
    pub style: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
/// Generic entry point: `{text, task, job_text?, tone?}`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    require_text("text", &request.text)?;
    if request.task.needs_job_text() {
        require_text("job_text", &request.job_text)?;
    }
    let provider = provider(&state)?;
    Ok(Json(run(provider.as_ref(), &request).await?))
}

/// POST /api/v1/analyze/job
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeJobRequest>,
) -> Result<Json<JobAnalysis>, AppError> {
    require_text("job_text", &request.job_text)?;
    let provider = provider(&state)?;
    Ok(Json(analyze_job(provider.as_ref(), &request.job_text).await?))
}

/// POST /api/v1/resume/suggest-improvements
pub async fn handle_suggest_improvements(
    State(state): State<AppState>,
    Json(request): Json<SuggestImprovementsRequest>,
) -> Result<Json<Suggestions>, AppError> {
    require_text("resume_text", &request.resume_text)?;
    let provider = provider(&state)?;
    let result = suggest_improvements(
        provider.as_ref(),
        &request.resume_text,
        &request.job_text,
        request.tone,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/v1/resume/analyze
pub async fn handle_review_resume(
    State(state): State<AppState>,
    Json(request): Json<ReviewResumeRequest>,
) -> Result<Json<ResumeReview>, AppError> {
    require_text("resume_text", &request.resume_text)?;
    let provider = provider(&state)?;
    Ok(Json(review_resume(provider.as_ref(), &request.resume_text, request.tone).await?))
}

/// POST /api/v1/resume/match
pub async fn handle_match_job(
    State(state): State<AppState>,
    Json(request): Json<MatchJobRequest>,
) -> Result<Json<JobMatch>, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_text", &request.job_text)?;
    let provider = provider(&state)?;
    let result = match_resume_to_job(
        provider.as_ref(),
        &request.resume_text,
        &request.job_text,
        request.tone,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/v1/resume/apply-improvements
///
/// The model returns plain text only; LaTeX is produced by the escaping
/// renderer, so model output can never inject markup.
pub async fn handle_apply_improvements(
    State(state): State<AppState>,
    Json(request): Json<ApplyImprovementsRequest>,
) -> Result<Json<ApplyImprovementsResponse>, AppError> {
    require_text("resume_text", &request.resume_text)?;
    if request.suggestions.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::Validation("suggestions cannot be empty".to_string()));
    }
    // Fail on an unknown template before spending a model call.
    let style: crate::render::templates::TemplateStyle = request.style.parse()?;

    let provider = provider(&state)?;
    let text = apply_improvements(
        provider.as_ref(),
        &request.resume_text,
        &request.suggestions,
        &request.job_text,
        request.tone,
    )
    .await?;

    let latex = render(&RenderRequest {
        text: text.clone(),
        style: style.id().to_string(),
        metadata: request.metadata,
        suggestions: Vec::new(),
        layout: Layout::Resume,
    })?;

    Ok(Json(ApplyImprovementsResponse {
        text,
        latex,
        style: style.id().to_string(),
    }))
}

fn provider(state: &AppState) -> Result<Arc<dyn CompletionProvider>, AppError> {
    state.llm.clone().ok_or_else(|| {
        AppError::ProviderNotConfigured(
            "set BEETUNE_AI_PROVIDER (and BEETUNE_AI_API_KEY) to enable analysis".to_string(),
        )
    })
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
