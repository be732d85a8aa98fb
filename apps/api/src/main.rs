use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beetune_api::config::Config;
use beetune_api::llm_client::{CompletionProvider, LlmClient};
use beetune_api::routes::build_router;
use beetune_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting beetune API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (optional)
    let llm: Option<Arc<dyn CompletionProvider>> = match config.ai.clone() {
        Some(ai) => {
            info!(
                "LLM client initialized (provider: {}, model: {})",
                ai.provider.as_str(),
                ai.model
            );
            let client: Arc<dyn CompletionProvider> = Arc::new(LlmClient::new(ai)?);
            Some(client)
        }
        None => {
            warn!("No AI provider configured; analysis endpoints are disabled");
            None
        }
    };

    info!(
        "Pipeline: upload limit {} bytes, compiler '{}', {} pass(es), {}s timeout",
        config.pipeline.max_upload_bytes,
        config.pipeline.latex_program,
        config.pipeline.latex_passes,
        config.pipeline.latex_timeout.as_secs()
    );

    let state = AppState::new(config.clone(), llm);

    match state.compiler.check_installation().await {
        Ok(version) => info!("LaTeX toolchain: {version}"),
        Err(e) => warn!("LaTeX toolchain unavailable, PDF endpoints will fail: {e}"),
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
