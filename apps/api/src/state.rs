use std::sync::Arc;

use crate::compile::LatexCompiler;
use crate::config::Config;
use crate::intake::IntakeValidator;
use crate::llm_client::CompletionProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when no AI provider is configured; analysis routes then answer 503.
    pub llm: Option<Arc<dyn CompletionProvider>>,
    pub intake: IntakeValidator,
    pub compiler: Arc<LatexCompiler>,
}

impl AppState {
    pub fn new(config: Config, llm: Option<Arc<dyn CompletionProvider>>) -> Self {
        let intake = IntakeValidator::from_config(&config.pipeline);
        let compiler = Arc::new(LatexCompiler::from_config(&config.pipeline));
        Self {
            config,
            llm,
            intake,
            compiler,
        }
    }
}
