// Prompt constants and builders for the analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_FABRICATION, PLAIN_TEXT_ONLY};

/// Voice the advisor speaks in.
/// Accepted case-insensitively from request bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PromptTone {
    #[default]
    Professional,
    Casual,
    Enthusiastic,
    Concise,
}

impl PromptTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTone::Professional => "professional",
            PromptTone::Casual => "casual",
            PromptTone::Enthusiastic => "enthusiastic",
            PromptTone::Concise => "concise",
        }
    }

    /// Persona line that opens every system prompt.
    pub fn modifier(&self) -> &'static str {
        match self {
            PromptTone::Professional => "You are a professional career advisor with extensive experience in recruitment and talent acquisition.",
            PromptTone::Casual => "You are a friendly career coach who helps job seekers in a relaxed, approachable manner.",
            PromptTone::Enthusiastic => "You are an energetic career expert who is passionate about helping people succeed.",
            PromptTone::Concise => "You are an efficient career advisor who provides clear, direct guidance.",
        }
    }
}

impl fmt::Display for PromptTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(PromptTone::Professional),
            "casual" => Ok(PromptTone::Casual),
            "enthusiastic" => Ok(PromptTone::Enthusiastic),
            "concise" => Ok(PromptTone::Concise),
            other => Err(format!(
                "unknown tone '{other}' (expected professional, casual, enthusiastic or concise)"
            )),
        }
    }
}

impl TryFrom<String> for PromptTone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Job analysis prompt. Replace `{job_text}` before sending.
pub const JOB_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "keywords": ["Rust", "distributed systems", "Kubernetes"],
  "benefits": ["Remote-first", "Equity"]
}

Rules:
- keywords: skills, technologies, qualifications and domain terms a resume should mention. Most important first. At most 25.
- benefits: perks, compensation details and working conditions the employer offers. Empty list if none are stated.
- Extract only what is explicitly in the text. Include acronyms and their full forms when both appear.

Job description:
{job_text}"#;

/// Suggestion prompt. Replace `{resume_text}` and `{job_text}` before sending.
pub const SUGGESTIONS_PROMPT_TEMPLATE: &str = r#"Review the resume against the job description and suggest targeted improvements.

Return a JSON object with this EXACT schema (no extra fields):
{
  "suggestions": ["Quantify the latency reduction in the Acme role", "Move Rust to the top of the skills list"]
}

Rules:
- Each suggestion is one specific, actionable change to the resume. No generic advice.
- Consider both content and presentation.
- Do NOT rewrite the resume.
- At most 10 suggestions, most impactful first.

Resume:
{resume_text}

Job description:
{job_text}"#;

/// Rewrite prompt. Replace `{resume_text}`, `{suggestions}` and `{job_text}` before sending.
pub const APPLY_PROMPT_TEMPLATE: &str = r#"Rewrite the resume below, applying the suggestions.

Keep the section headings (Summary, Experience, Education, Skills, Projects, ...) each on its own line,
keep the contact details on the first lines, and return the complete resume.

Suggestions:
{suggestions}

Job description:
{job_text}

Resume:
{resume_text}"#;

/// General review prompt. Replace `{resume_text}` before sending.
pub const RESUME_REVIEW_PROMPT_TEMPLATE: &str = r#"Review the following resume and give structured feedback.

Return a JSON object with this EXACT schema (no extra fields):
{
  "strengths": ["Clear impact metrics in the Acme role"],
  "improvements": ["Summary is generic"],
  "missing_sections": ["Projects"],
  "keywords": ["observability", "CI/CD"],
  "overall_assessment": "Two or three sentences.",
  "suggestions": ["Lead the summary with the Rust migration"]
}

Rules:
- strengths and improvements refer to what the resume actually says.
- missing_sections names standard resume sections that are absent. Empty list if none.
- keywords are terms worth adding for the candidate's apparent field.
- At most 10 entries per list.

Resume:
{resume_text}"#;

/// Resume-to-job match prompt. Replace `{resume_text}` and `{job_text}` before sending.
pub const JOB_MATCH_PROMPT_TEMPLATE: &str = r#"Compare the resume against the job description and assess the fit.

Return a JSON object with this EXACT schema (no extra fields):
{
  "match_percentage": 75,
  "missing_skills": ["Kubernetes"],
  "relevant_experiences": ["Led the payments API rewrite at Acme"],
  "job_keywords": ["distributed systems"],
  "improvements": ["Mention on-call experience"],
  "strengths": ["Five years of production Rust"],
  "suggestions": ["Move the Acme rewrite to the top of Experience"],
  "overall_assessment": "Two or three sentences about this specific job."
}

Rules:
- match_percentage is an integer from 0 to 100.
- missing_skills are requirements from the job description the resume does not show.
- job_keywords come from the job description and are absent or weak in the resume.
- At most 10 entries per list.

Job description:
{job_text}

Resume:
{resume_text}"#;

/// Persona plus the JSON-only contract.
pub fn json_system(tone: PromptTone) -> String {
    format!("{} {JSON_ONLY_SYSTEM}", tone.modifier())
}

/// Persona plus the plain-text and no-fabrication rules.
pub fn rewrite_system(tone: PromptTone) -> String {
    format!("{} {PLAIN_TEXT_ONLY} {NO_FABRICATION}", tone.modifier())
}

pub fn job_analysis_prompt(job_text: &str) -> String {
    JOB_ANALYSIS_PROMPT_TEMPLATE.replace("{job_text}", job_text)
}

pub fn suggestions_prompt(resume_text: &str, job_text: &str) -> String {
    SUGGESTIONS_PROMPT_TEMPLATE
        .replace("{job_text}", or_none(job_text))
        .replace("{resume_text}", resume_text)
}

pub fn apply_prompt(resume_text: &str, suggestions: &[String], job_text: &str) -> String {
    let suggestions = suggestions
        .iter()
        .map(|s| format!("- {}", s.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    APPLY_PROMPT_TEMPLATE
        .replace("{suggestions}", &suggestions)
        .replace("{job_text}", or_none(job_text))
        .replace("{resume_text}", resume_text)
}

pub fn resume_review_prompt(resume_text: &str) -> String {
    RESUME_REVIEW_PROMPT_TEMPLATE.replace("{resume_text}", resume_text)
}

pub fn job_match_prompt(resume_text: &str, job_text: &str) -> String {
    JOB_MATCH_PROMPT_TEMPLATE
        .replace("{job_text}", job_text)
        .replace("{resume_text}", resume_text)
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(not provided)"
    } else {
        text
    }
}
