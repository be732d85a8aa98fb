//! AI-assisted analysis of job descriptions and resumes.
//!
//! Everything here goes through [`CompletionProvider`], never a concrete client,
//! and nothing here produces LaTeX: rewritten resumes come back as plain text
//! and are rendered by [`crate::render`].

pub mod handlers;
pub mod job;
pub mod prompts;
pub mod review;
pub mod suggestions;

use serde::{Deserialize, Serialize};

use crate::llm_client::{CompletionProvider, LlmError};
pub use job::{analyze_job, JobAnalysis};
pub use prompts::PromptTone;
pub use review::{match_resume_to_job, review_resume, JobMatch, ResumeReview};
pub use suggestions::{apply_improvements, suggest_improvements, Suggestions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisTask {
    AnalyzeJob,
    SuggestImprovements,
    ReviewResume,
    MatchJob,
}

impl AnalysisTask {
    /// Whether `job_text` must be non-empty for this task.
    pub fn needs_job_text(&self) -> bool {
        matches!(self, AnalysisTask::MatchJob)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    /// Job description for `analyze-job`, resume for every other task.
    pub text: String,
    pub task: AnalysisTask,
    /// Job description to target; required by `match-job`.
    #[serde(default)]
    pub job_text: String,
    #[serde(default)]
    pub tone: PromptTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Job(JobAnalysis),
    Suggestions(Suggestions),
    Review(ResumeReview),
    Match(JobMatch),
}

/// Dispatches one analysis task.
pub async fn run(
    provider: &dyn CompletionProvider,
    request: &AnalysisRequest,
) -> Result<AnalysisOutcome, LlmError> {
    match request.task {
        AnalysisTask::AnalyzeJob => analyze_job(provider, &request.text)
            .await
            .map(AnalysisOutcome::Job),
        AnalysisTask::SuggestImprovements => {
            suggest_improvements(provider, &request.text, &request.job_text, request.tone)
                .await
                .map(AnalysisOutcome::Suggestions)
        }
        AnalysisTask::ReviewResume => review_resume(provider, &request.text, request.tone)
            .await
            .map(AnalysisOutcome::Review),
        AnalysisTask::MatchJob => {
            match_resume_to_job(provider, &request.text, &request.job_text, request.tone)
                .await
                .map(AnalysisOutcome::Match)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm_client::CompletionRequest;

    /// Replies with canned responses in order and records (system, prompt) pairs.
    pub(crate) struct Scripted {
        replies: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        pub(crate) fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn prompts(&self) -> Vec<(String, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.system.to_string(), request.prompt.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(LlmError::EmptyContent)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_run_dispatches_on_task() {
        let provider = Scripted::new(vec![
            r#"{"keywords": ["Go"], "benefits": []}"#,
            r#"{"suggestions": ["Mention Go"]}"#,
        ]);

        let request: AnalysisRequest =
            serde_json::from_str(r#"{"text": "Go developer", "task": "analyze-job"}"#).unwrap();
        let outcome = run(&provider, &request).await.unwrap();
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"keywords": ["Go"], "benefits": []})
        );

        let request: AnalysisRequest = serde_json::from_str(
            r#"{"text": "resume", "task": "suggest-improvements", "job_text": "Go developer", "tone": "Concise"}"#,
        )
        .unwrap();
        match run(&provider, &request).await.unwrap() {
            AnalysisOutcome::Suggestions(s) => assert_eq!(s.suggestions, vec!["Mention Go"]),
            other => panic!("expected suggestions, got {other:?}"),
        }
        assert!(provider.prompts()[1].0.starts_with("You are an efficient career advisor"));
    }

    #[tokio::test]
    async fn test_run_reviews_and_matches_resumes() {
        let provider = Scripted::new(vec![
            r#"{"strengths": ["Rust"], "missing_sections": ["Education"], "overall_assessment": "Good."}"#,
            r#"{"match_percentage": "60%", "missing_skills": ["Go"]}"#,
        ]);

        let request: AnalysisRequest =
            serde_json::from_str(r#"{"text": "resume", "task": "review-resume"}"#).unwrap();
        match run(&provider, &request).await.unwrap() {
            AnalysisOutcome::Review(r) => assert_eq!(r.missing_sections, vec!["Education"]),
            other => panic!("expected review, got {other:?}"),
        }

        let request: AnalysisRequest = serde_json::from_str(
            r#"{"text": "resume", "task": "match-job", "job_text": "Go developer"}"#,
        )
        .unwrap();
        assert!(request.task.needs_job_text());
        let outcome = run(&provider, &request).await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["match_percentage"], 60);
        assert_eq!(value["missing_skills"], serde_json::json!(["Go"]));
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let parsed = serde_json::from_str::<AnalysisRequest>(r#"{"text": "x", "task": "summarize"}"#);
        assert!(parsed.is_err());
    }
}
