use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::job::tidy;
use crate::analysis::prompts::{apply_prompt, json_system, rewrite_system, suggestions_prompt, PromptTone};
use crate::llm_client::{complete_json, CompletionProvider, CompletionRequest, LlmError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Asks for targeted improvements of a resume against a job description.
pub async fn suggest_improvements(
    provider: &dyn CompletionProvider,
    resume_text: &str,
    job_text: &str,
    tone: PromptTone,
) -> Result<Suggestions, LlmError> {
    let system = json_system(tone);
    let prompt = suggestions_prompt(resume_text, job_text);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        max_tokens: 1000,
        temperature: 0.3,
    };

    let mut result: Suggestions = complete_json(provider, &request).await?;
    result.suggestions = tidy(result.suggestions);

    info!(
        "Generated {} suggestions via {} ({} tone)",
        result.suggestions.len(),
        provider.model(),
        tone
    );
    Ok(result)
}

/// Rewrites the resume with the suggestions applied.
///
/// Returns plain text; callers render it through the escaping renderer.
pub async fn apply_improvements(
    provider: &dyn CompletionProvider,
    resume_text: &str,
    suggestions: &[String],
    job_text: &str,
    tone: PromptTone,
) -> Result<String, LlmError> {
    let system = rewrite_system(tone);
    let prompt = apply_prompt(resume_text, suggestions, job_text);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        max_tokens: 4000,
        temperature: 0.1,
    };

    let text = provider.complete(&request).await?;
    let text = strip_text_fences(&text).trim().to_string();
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }

    info!(
        "Applied {} suggestions via {}: {} -> {} bytes",
        suggestions.len(),
        provider.model(),
        resume_text.len(),
        text.len()
    );
    Ok(text)
}

/// Drops a wrapping ``` fence (with any language tag) if the model added one.
fn strip_text_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.split_once('\n') {
        Some((_tag, inner)) => inner,
        None => body,
    }
}
