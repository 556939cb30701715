//! HTTP surface of the review bot.
//!
//! One webhook endpoint receives GitHub events, qualifies them and hands
//! off to the review pipeline in a background task; one health endpoint
//! reports the running configuration (never credentials).

use std::{error::Error, sync::Arc};

pub mod core;
pub mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tracing::info;

use crate::core::app_state::AppState;
use crate::routes::{health::health_route::health, webhook::webhook_route::receive_webhook};
use pr_reviewer::ReviewConfig;

/// Builds the application router over shared state. Exposed for tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(receive_webhook))
        .with_state(state)
}

/// Loads configuration, binds the listener and serves until Ctrl+C.
pub async fn start() -> Result<(), Box<dyn Error>> {
    let config = ReviewConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config)?);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("shutdown signal listener failed: {err}");
    }
}
