use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::prompts::{job_analysis_prompt, json_system, PromptTone};
use crate::llm_client::{complete_json, CompletionProvider, CompletionRequest, LlmError};

/// Keywords and benefits pulled out of a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

/// Extracts keywords and benefits from a job description.
pub async fn analyze_job(
    provider: &dyn CompletionProvider,
    job_text: &str,
) -> Result<JobAnalysis, LlmError> {
    let system = json_system(PromptTone::Professional);
    let prompt = job_analysis_prompt(job_text);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        max_tokens: 600,
        temperature: 0.3,
    };

    let mut analysis: JobAnalysis = complete_json(provider, &request).await?;
    analysis.keywords = tidy(analysis.keywords);
    analysis.benefits = tidy(analysis.benefits);

    info!(
        "Job analysis via {}: {} keywords, {} benefits",
        provider.model(),
        analysis.keywords.len(),
        analysis.benefits.len()
    );
    Ok(analysis)
}

/// Trims entries and drops blanks and case-insensitive duplicates, keeping order.
pub(crate) fn tidy(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
