// HTTP surface for narration synthesis
//
// Thin axum layer over `VoiceRequestRouter`: request and response DTOs live in
// `routes`, everything else is delegated to the core crate.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use storyvoice_core::VoiceRequestRouter;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<VoiceRequestRouter>,
}

/// Build the HTTP application around a configured router.
pub fn app(router: Arc<VoiceRequestRouter>) -> Router {
    Router::new()
        .route("/generate-voice", post(routes::generate_voice))
        .route("/clear-voice-cache", post(routes::clear_voice_cache))
        .route("/voice-info", get(routes::voice_info))
        .route("/health", get(routes::health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(AppState { router })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(router: Arc<VoiceRequestRouter>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(url = %format!("http://{}", addr), "Voice server ready");

    axum::serve(listener, app(router))
        .await
        .context("Voice server stopped unexpectedly")
}
