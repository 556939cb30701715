use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    routes::webhook::webhook_event::{WebhookPayload, qualify},
};

type HmacSha256 = Hmac<Sha256>;

/// POST /webhook
///
/// GitHub delivery entry point. Verifies the HMAC signature when a
/// secret is configured, qualifies the event, and acknowledges
/// immediately; the review itself runs in a background task so the
/// delivery never waits on GitHub or the model.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event_type = header_str(&headers, "x-github-event").unwrap_or("unknown");
    let delivery = header_str(&headers, "x-github-delivery").unwrap_or("-");
    debug!(event_type, delivery, "webhook delivery received");

    match &state.config.webhook_secret {
        Some(secret) => {
            let signature = header_str(&headers, "x-hub-signature-256");
            if !verify_signature(secret, &body, signature) {
                warn!(delivery, "webhook signature verification failed");
                return ApiResponse::<()>::error("INVALID_SIGNATURE", "signature mismatch")
                    .into_response_with_status(StatusCode::UNAUTHORIZED);
            }
        }
        None => {
            warn!(delivery, "webhook signature verification is disabled");
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(err) => {
            warn!(delivery, "webhook payload rejected: {err}");
            return ApiResponse::<()>::error("BAD_PAYLOAD", "payload is not valid JSON")
                .into_response_with_status(StatusCode::BAD_REQUEST);
        }
    };

    let target = state.config.target_repository.as_deref();
    let Some(trigger) = qualify(event_type, &payload, target) else {
        debug!(event_type, delivery, "delivery does not qualify for review");
        return ApiResponse::success(json!({ "status": "skipped" }))
            .into_response_with_status(StatusCode::OK);
    };

    info!(
        repo = %trigger.repo,
        pr = trigger.pr_number,
        source = trigger.source.as_str(),
        delivery,
        "review accepted"
    );

    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        let result = pr_reviewer::run_review(
            &task_state.config,
            &task_state.github,
            &task_state.ai,
            &trigger,
        )
        .await;
        if let Err(err) = result {
            error!(
                repo = %trigger.repo,
                pr = trigger.pr_number,
                "review run failed: {err}"
            );
        }
    });

    ApiResponse::success(json!({ "status": "accepted" }))
        .into_response_with_status(StatusCode::ACCEPTED)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Checks a `sha256=<hex>` header against the raw delivery body.
/// The comparison runs in constant time via the MAC verifier.
fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(hex_digest) = header.and_then(|h| h.strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"action":"opened"}"#;
        let header = sign("s3cret", body);
        assert!(verify_signature("s3cret", body, Some(&header)));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = br#"{"action":"opened"}"#;
        let header = sign("other", body);
        assert!(!verify_signature("s3cret", body, Some(&header)));
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("s3cret", br#"{"action":"opened"}"#);
        assert!(!verify_signature(
            "s3cret",
            br#"{"action":"closed"}"#,
            Some(&header)
        ));
    }

    #[test]
    fn missing_or_malformed_headers_fail() {
        let body = b"x";
        assert!(!verify_signature("s3cret", body, None));
        assert!(!verify_signature("s3cret", body, Some("deadbeef")));
        assert!(!verify_signature("s3cret", body, Some("sha256=nothex")));
    }
}
