use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use serde_json::json;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

/// GET /health
///
/// Liveness plus a snapshot of the non-sensitive configuration.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let cfg = &state.config;
    let snapshot = json!({
        "status": "ok",
        "service": "pr-review-bot",
        "version": env!("CARGO_PKG_VERSION"),
        "model": cfg.ai_model_name,
        "review_label": cfg.review_label,
        "include_file_context": cfg.include_file_context,
        "max_files_per_review": cfg.max_files_per_review,
        "max_prompt_length": cfg.max_prompt_length,
        "max_retry_attempts": cfg.max_retry_attempts,
        "retry_delay_secs": cfg.retry_delay.as_secs_f64(),
        "request_timeout_secs": cfg.request_timeout.as_secs(),
        "signature_verification": cfg.webhook_secret.is_some(),
        "target_repository": cfg.target_repository,
    });
    ApiResponse::success(snapshot).into_response_with_status(StatusCode::OK)
}
