//! Lightweight Gemini service for text generation.
//!
//! Thin client for the Google AI REST API:
//! - `POST {endpoint}/models/{model}:generateContent?key=...` — synchronous
//!   single-prompt generation, no streaming.
//!
//! Candidate parts are flattened into one plain-text reply. An empty reply
//! with a block reason maps to [`RejectionKind::ContentFiltered`] so the
//! caller never mistakes a filtered prompt for a transport problem.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error_handler::{
    AiServiceError, ConfigError, RejectionKind, Result, validate_http_endpoint,
};

/// Default public endpoint of the Google AI generative language API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime configuration for [`GeminiService`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (query-string authentication).
    pub api_key: String,
    /// Model name, e.g. "gemini-1.5-pro-latest".
    pub model: String,
    /// API base, defaults to [`DEFAULT_ENDPOINT`].
    pub endpoint: String,
    /// Optional cap on the response size.
    pub max_output_tokens: Option<u32>,
    /// Transport-level timeout for one request.
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Builds a config against the public endpoint.
    pub fn new(api_key: String, model: String, request_timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_output_tokens: None,
            request_timeout,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey.into());
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        validate_http_endpoint(self.endpoint.trim())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

/// Thin client for Gemini.
///
/// Reuses one HTTP client with a configurable timeout and exposes a single
/// high-level call, [`GeminiService::generate`].
#[derive(Debug, Clone)]
pub struct GeminiService {
    http: reqwest::Client,
    cfg: GeminiConfig,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiServiceError::Config`] if the key, model or endpoint is invalid
    /// - [`AiServiceError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: GeminiConfig) -> Result<Self> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { http, cfg })
    }

    /// Model name this service is configured with.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Sends one prompt and returns the flattened plain-text reply.
    ///
    /// # Errors
    /// - [`AiServiceError::Rejected`] for 4xx, quota and safety blocks
    /// - [`AiServiceError::Server`] for upstream 5xx
    /// - [`AiServiceError::HttpTransport`] for connect/timeout failures
    /// - [`AiServiceError::Decode`] for unexpected payload shapes
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.cfg.endpoint.trim_end_matches('/'),
            self.cfg.model,
            self.cfg.api_key
        );
        debug!(
            model = %self.cfg.model,
            prompt_chars = prompt.chars().count(),
            "gemini.generate"
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: self.cfg.max_output_tokens,
            },
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let snippet: String = resp.text().await.unwrap_or_default().chars().take(300).collect();
            return Err(AiServiceError::from_status(status.as_u16(), snippet));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AiServiceError::Decode(e.to_string()))?;
        Self::extract_text(parsed)
    }

    fn extract_text(parsed: GenerateResponse) -> Result<String> {
        if let Some(feedback) = &parsed.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(AiServiceError::Rejected {
                    kind: RejectionKind::ContentFiltered,
                    detail: format!("prompt blocked: {reason}"),
                });
            }
        }

        let candidates = parsed.candidates.unwrap_or_default();
        let filtered = candidates
            .iter()
            .any(|c| matches!(c.finish_reason.as_deref(), Some("SAFETY" | "BLOCKLIST")));

        let text = candidates
            .into_iter()
            .flat_map(|c| c.content.and_then(|content| content.parts).unwrap_or_default())
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            if filtered {
                return Err(AiServiceError::Rejected {
                    kind: RejectionKind::ContentFiltered,
                    detail: "candidate blocked by safety filters".into(),
                });
            }
            return Err(AiServiceError::Decode("response contains no text".into()));
        }
        Ok(text)
    }
}
