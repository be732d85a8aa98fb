use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::analysis::job::tidy;
use crate::analysis::prompts::{job_match_prompt, json_system, resume_review_prompt, PromptTone};
use crate::llm_client::{complete_json, CompletionProvider, CompletionRequest, LlmError};

/// Structured feedback on a resume with no particular job in mind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeReview {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub missing_sections: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub overall_assessment: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// How well a resume fits one job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    /// 0 to 100.
    #[serde(deserialize_with = "percentage")]
    pub match_percentage: u8,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub relevant_experiences: Vec<String>,
    #[serde(default)]
    pub job_keywords: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub overall_assessment: String,
}

/// Reviews a resume on its own: strengths, gaps, missing sections and keywords.
pub async fn review_resume(
    provider: &dyn CompletionProvider,
    resume_text: &str,
    tone: PromptTone,
) -> Result<ResumeReview, LlmError> {
    let system = json_system(tone);
    let prompt = resume_review_prompt(resume_text);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        max_tokens: 1500,
        temperature: 0.3,
    };

    let mut review: ResumeReview = complete_json(provider, &request).await?;
    review.strengths = tidy(review.strengths);
    review.improvements = tidy(review.improvements);
    review.missing_sections = tidy(review.missing_sections);
    review.keywords = tidy(review.keywords);
    review.suggestions = tidy(review.suggestions);
    review.overall_assessment = review.overall_assessment.trim().to_string();

    info!(
        "Resume review via {}: {} strengths, {} improvements, {} missing sections",
        provider.model(),
        review.strengths.len(),
        review.improvements.len(),
        review.missing_sections.len()
    );
    Ok(review)
}

/// Scores a resume against a job description and lists the gaps.
pub async fn match_resume_to_job(
    provider: &dyn CompletionProvider,
    resume_text: &str,
    job_text: &str,
    tone: PromptTone,
) -> Result<JobMatch, LlmError> {
    let system = json_system(tone);
    let prompt = job_match_prompt(resume_text, job_text);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        max_tokens: 2000,
        temperature: 0.3,
    };

    let mut fit: JobMatch = complete_json(provider, &request).await?;
    fit.missing_skills = tidy(fit.missing_skills);
    fit.relevant_experiences = tidy(fit.relevant_experiences);
    fit.job_keywords = tidy(fit.job_keywords);
    fit.improvements = tidy(fit.improvements);
    fit.strengths = tidy(fit.strengths);
    fit.suggestions = tidy(fit.suggestions);
    fit.overall_assessment = fit.overall_assessment.trim().to_string();

    info!(
        "Job match via {}: {}%, {} missing skills",
        provider.model(),
        fit.match_percentage,
        fit.missing_skills.len()
    );
    Ok(fit)
}

/// Accepts `75`, `74.6` or `"75%"`, clamped to 0..=100.
fn percentage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .map(|n| n.clamp(0.0, 100.0).round() as u8)
        .ok_or_else(|| serde::de::Error::custom(format!("match_percentage is not a number: {value}")))
}
