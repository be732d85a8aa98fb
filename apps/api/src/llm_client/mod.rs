//! LLM client: the single point of entry for all AI completion calls in beetune.
//!
//! No other module talks to a provider API directly; analysis code goes through
//! the [`CompletionProvider`] trait so it can be exercised without a network.
//!
//! Two wire shapes are supported: OpenAI-compatible chat completions (OpenAI,
//! Ollama, custom gateways) and the Anthropic Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AiProvider, ProviderConfig};

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A single prompt/response exchange.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Calls the provider and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest<'_>,
) -> Result<T, LlmError> {
    let text = provider.complete(request).await?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(text).map_err(LlmError::Parse)
}

// ── OpenAI-compatible wire types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

// ── Anthropic wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

/// HTTP client for the configured provider.
/// Wraps the provider API with retry logic on 429 and 5xx responses.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: ProviderConfig,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        match self.config.provider {
            AiProvider::Anthropic => format!("{}/v1/messages", self.config.endpoint),
            AiProvider::OpenAi | AiProvider::Ollama | AiProvider::Custom => {
                format!("{}/chat/completions", self.config.endpoint)
            }
        }
    }

    fn build(&self, request: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let builder = self.client.post(self.url());
        match self.config.provider {
            AiProvider::Anthropic => builder
                .header("x-api-key", self.config.api_key.as_deref().unwrap_or_default())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&AnthropicRequest {
                    model: &self.config.model,
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                    system: request.system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: request.prompt,
                    }],
                }),
            AiProvider::OpenAi | AiProvider::Ollama | AiProvider::Custom => {
                let builder = match &self.config.api_key {
                    Some(key) => builder.bearer_auth(key),
                    None => builder,
                };
                builder.json(&ChatRequest {
                    model: &self.config.model,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: request.system,
                        },
                        ChatMessage {
                            role: "user",
                            content: request.prompt,
                        },
                    ],
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                })
            }
        }
    }

    async fn parse_success(&self, response: reqwest::Response) -> Result<String, LlmError> {
        let text = match self.config.provider {
            AiProvider::Anthropic => {
                let body: AnthropicResponse = response.json().await?;
                debug!(
                    "LLM call succeeded: input_tokens={}, output_tokens={}",
                    body.usage.input_tokens, body.usage.output_tokens
                );
                body.text().map(str::to_string)
            }
            AiProvider::OpenAi | AiProvider::Ollama | AiProvider::Custom => {
                let body: ChatResponse = response.json().await?;
                if let Some(usage) = &body.usage {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        usage.prompt_tokens, usage.completion_tokens
                    );
                }
                body.choices.into_iter().next().and_then(|c| c.message.content)
            }
        };

        match text.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(LlmError::EmptyContent),
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.build(request).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(self.config.provider, body),
                });
            }

            return self.parse_success(response).await;
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Pulls the human-readable message out of a provider error body, if it parses.
fn error_message(provider: AiProvider, body: String) -> String {
    let parsed = match provider {
        AiProvider::Anthropic => serde_json::from_str::<AnthropicError>(&body)
            .map(|e| e.error.message)
            .ok(),
        AiProvider::OpenAi | AiProvider::Ollama | AiProvider::Custom => {
            serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .ok()
        }
    };
    parsed.unwrap_or(body)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(provider: AiProvider, endpoint: &str) -> LlmClient {
        LlmClient::new(ProviderConfig {
            provider,
            api_key: Some("sk-test".to_string()),
            endpoint: endpoint.to_string(),
            model: provider.default_model().to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_url_per_provider_shape() {
        assert_eq!(
            client(AiProvider::OpenAi, "https://api.openai.com/v1").url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client(AiProvider::Ollama, "http://localhost:11434/v1").url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            client(AiProvider::Anthropic, "https://api.anthropic.com").url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_error_message_extraction_per_provider() {
        let openai = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            error_message(AiProvider::OpenAi, openai.to_string()),
            "Incorrect API key provided"
        );

        let anthropic = r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#;
        assert_eq!(
            error_message(AiProvider::Anthropic, anthropic.to_string()),
            "invalid x-api-key"
        );

        assert_eq!(
            error_message(AiProvider::Custom, "upstream exploded".to_string()),
            "upstream exploded"
        );
    }

    #[test]
    fn test_chat_response_deserializes() {
        let json = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hello"));
        assert_eq!(parsed.usage.unwrap().completion_tokens, 3);
    }

    #[test]
    fn test_anthropic_response_picks_text_block() {
        let json = r#"{
            "content": [{"type": "thinking", "text": null}, {"type": "text", "text": "hi"}],
            "usage": {"input_tokens": 4, "output_tokens": 1}
        }"#;
        let parsed: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text(), Some("hi"));
    }

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_complete_json_strips_fences() {
        #[derive(Deserialize)]
        struct Out {
            keywords: Vec<String>,
        }

        let provider = Canned("```json\n{\"keywords\": [\"Rust\"]}\n```");
        let request = CompletionRequest {
            system: "s",
            prompt: "p",
            max_tokens: 10,
            temperature: 0.0,
        };
        let out: Out = complete_json(&provider, &request).await.unwrap();
        assert_eq!(out.keywords, vec!["Rust".to_string()]);
    }
}
