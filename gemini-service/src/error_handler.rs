//! Unified error handling for `gemini-service`.
//!
//! One top-level [`AiServiceError`] for the whole crate, with rejection
//! kinds kept explicit: a quota or key problem must never be confused with
//! a transient transport failure, since only the latter deserves a retry.

use std::time::Duration;

use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiServiceError>;

/// Top-level error for the `gemini-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiServiceError {
    /// Configuration/validation errors (startup time).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model provider rejected the request; retrying will not help.
    #[error("gemini rejected the request ({kind}): {detail}")]
    Rejected { kind: RejectionKind, detail: String },

    /// Upstream 5xx from the inference API.
    #[error("gemini server error: status {0}")]
    Server(u16),

    /// Underlying HTTP transport error.
    #[error("transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Response payload could not be decoded as expected.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Why the provider refused to serve the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// 401/403: key missing, expired or lacking access to the model.
    InvalidKey,
    /// 429: quota or rate limit exhausted.
    QuotaExceeded,
    /// The prompt or the candidate was blocked by safety filters.
    ContentFiltered,
    /// 400 and other client-side request problems.
    BadRequest,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectionKind::InvalidKey => "invalid key",
            RejectionKind::QuotaExceeded => "quota exceeded",
            RejectionKind::ContentFiltered => "content filtered",
            RejectionKind::BadRequest => "bad request",
        };
        f.write_str(s)
    }
}

/// Configuration and setup errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Model name was empty or invalid.
    #[error("model name must not be empty")]
    EmptyModel,

    /// API key was empty.
    #[error("api key must not be empty")]
    EmptyApiKey,

    /// Endpoint is empty or does not start with http/https.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidEndpoint(value.to_string()).into())
    }
}

impl AiServiceError {
    /// Maps an HTTP status from the inference API to an error variant.
    pub(crate) fn from_status(status: u16, detail: String) -> Self {
        match status {
            401 | 403 => AiServiceError::Rejected {
                kind: RejectionKind::InvalidKey,
                detail,
            },
            429 => AiServiceError::Rejected {
                kind: RejectionKind::QuotaExceeded,
                detail,
            },
            500..=599 => AiServiceError::Server(status),
            _ => AiServiceError::Rejected {
                kind: RejectionKind::BadRequest,
                detail,
            },
        }
    }
}
