use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health
/// Service status plus whether the LaTeX toolchain and an AI provider are usable.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let latex = match state.compiler.check_installation().await {
        Ok(version) => json!({
            "available": true,
            "program": state.compiler.program(),
            "version": version,
        }),
        Err(e) => {
            warn!("LaTeX toolchain unavailable: {e}");
            json!({
                "available": false,
                "program": state.compiler.program(),
                "error": e.to_string(),
            })
        }
    };

    let ai = state.config.ai.as_ref().map(|ai| {
        json!({
            "provider": ai.provider.as_str(),
            "model": ai.model,
        })
    });

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "beetune-api",
        "latex": latex,
        "ai": ai,
    }))
}
