//! Crate-wide error hierarchy for the review pipeline.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Status-aware mapping for GitHub calls (401→Unauthorized, 429→RateLimited,
//!   5xx→Server, etc.) so the retry executor can tell transient from fatal.
//! - Ergonomic `?` via `From` impls, no dynamic dispatch.

use thiserror::Error;

use crate::retry::RetryError;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, Error>;

/// Root error type for the review pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration problems (missing credentials, bad numbers).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// GitHub API failure outside the retry executor.
    #[error(transparent)]
    Github(#[from] GithubError),

    /// Inference service failure outside the retry executor.
    #[error(transparent)]
    Ai(#[from] gemini_service::AiServiceError),

    /// Transient upstream failure that survived the whole retry budget.
    #[error("{op}: upstream call failed after {attempts} attempts: {detail}")]
    UpstreamCallFailed {
        op: &'static str,
        attempts: u32,
        detail: String,
    },

    /// 4xx/auth/quota rejection; reported immediately, never retried.
    #[error("{op}: upstream rejected the request: {detail}")]
    UpstreamRejected { op: &'static str, detail: String },
}

impl Error {
    /// Collapses a retry outcome into the upstream failure taxonomy.
    pub(crate) fn from_retry<E: std::fmt::Display>(op: &'static str, err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => Error::UpstreamCallFailed {
                op,
                attempts,
                detail: last.to_string(),
            },
            RetryError::Rejected(e) => Error::UpstreamRejected {
                op,
                detail: e.to_string(),
            },
        }
    }
}

/// Detailed GitHub-specific error used inside the client layer.
#[derive(Debug, Error)]
pub enum GithubError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (4xx/3xx) not covered above.
    #[error("http status error: {0}")]
    HttpStatus(u16),

    /// Timeout at transport level or per-attempt deadline.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of a GitHub response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration and setup errors, aggregated at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Everything wrong with the environment, one entry per variable.
    #[error("invalid configuration: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Github(GithubError::from(e))
    }
}

impl From<reqwest::Error> for GithubError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GithubError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => GithubError::Unauthorized,
                403 => GithubError::Forbidden,
                404 => GithubError::NotFound,
                429 => GithubError::RateLimited,
                500..=599 => GithubError::Server(code),
                _ => GithubError::HttpStatus(code),
            };
        }
        if e.is_decode() {
            return GithubError::InvalidResponse(e.to_string());
        }
        GithubError::Network(e.to_string())
    }
}
