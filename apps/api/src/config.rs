use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default upload ceiling: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_LATEX_PROGRAM: &str = "pdflatex";
pub const DEFAULT_LATEX_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LATEX_PASSES: u8 = 2;
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

/// Supported AI completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Ollama,
    Custom,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Ollama => "ollama",
            AiProvider::Custom => "custom",
        }
    }

    /// Endpoint used when none is configured. `Custom` has no default.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            AiProvider::OpenAi => Some("https://api.openai.com/v1"),
            AiProvider::Anthropic => Some("https://api.anthropic.com"),
            AiProvider::Ollama => Some("http://localhost:11434/v1"),
            AiProvider::Custom => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi | AiProvider::Custom => "gpt-4o",
            AiProvider::Anthropic => "claude-sonnet-4-5",
            AiProvider::Ollama => "llama3.1",
        }
    }

    fn requires_api_key(&self) -> bool {
        matches!(self, AiProvider::OpenAi | AiProvider::Anthropic)
    }
}

impl FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            "ollama" => Ok(AiProvider::Ollama),
            "custom" => Ok(AiProvider::Custom),
            other => bail!("Unknown AI provider '{other}' (expected openai, anthropic, ollama or custom)"),
        }
    }
}

/// Credentials and endpoint for the AI collaborator. Consumed as opaque strings.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

// Keep the key out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Limits and tooling for the document pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_upload_bytes: usize,
    pub latex_program: String,
    pub latex_timeout: Duration,
    pub latex_passes: u8,
    /// Parent directory for per-compile work directories. System temp dir when `None`.
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            latex_program: DEFAULT_LATEX_PROGRAM.to_string(),
            latex_timeout: Duration::from_secs(DEFAULT_LATEX_TIMEOUT_SECS),
            latex_passes: DEFAULT_LATEX_PASSES,
            work_dir: None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when no provider is configured; AI endpoints then report so.
    pub ai: Option<ProviderConfig>,
    pub pipeline: PipelineConfig,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ai = match get("BEETUNE_AI_PROVIDER") {
            Some(raw) => Some(provider_from_lookup(raw.parse()?, &get)?),
            None => None,
        };

        let defaults = PipelineConfig::default();
        let latex_passes = parse_or("BEETUNE_LATEX_PASSES", &get, defaults.latex_passes)?;
        if !(1..=3).contains(&latex_passes) {
            bail!("BEETUNE_LATEX_PASSES must be between 1 and 3, got {latex_passes}");
        }

        let pipeline = PipelineConfig {
            max_upload_bytes: parse_or("BEETUNE_MAX_UPLOAD_BYTES", &get, defaults.max_upload_bytes)?,
            latex_program: get("BEETUNE_LATEX_PROGRAM").unwrap_or(defaults.latex_program),
            latex_timeout: Duration::from_secs(parse_or(
                "BEETUNE_LATEX_TIMEOUT_SECS",
                &get,
                DEFAULT_LATEX_TIMEOUT_SECS,
            )?),
            latex_passes,
            work_dir: get("BEETUNE_WORK_DIR").map(PathBuf::from),
        };

        Ok(Config {
            ai,
            pipeline,
            port: parse_or("PORT", &get, 8080u16).context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn provider_from_lookup<G>(provider: AiProvider, get: &G) -> Result<ProviderConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let api_key = get("BEETUNE_AI_API_KEY");
    if provider.requires_api_key() && api_key.is_none() {
        bail!(
            "Required environment variable 'BEETUNE_AI_API_KEY' is not set (provider '{}')",
            provider.as_str()
        );
    }

    let endpoint = match get("BEETUNE_AI_ENDPOINT") {
        Some(endpoint) => endpoint,
        None => provider
            .default_endpoint()
            .map(str::to_string)
            .with_context(|| {
                format!(
                    "Provider '{}' needs BEETUNE_AI_ENDPOINT to be set",
                    provider.as_str()
                )
            })?,
    };

    Ok(ProviderConfig {
        provider,
        api_key,
        endpoint: endpoint.trim_end_matches('/').to_string(),
        model: get("BEETUNE_AI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
        timeout: Duration::from_secs(parse_or(
            "BEETUNE_AI_TIMEOUT_SECS",
            get,
            DEFAULT_AI_TIMEOUT_SECS,
        )?),
    })
}

fn parse_or<T, G>(key: &str, get: &G, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
