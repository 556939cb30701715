use gemini_service::{GeminiConfig, GeminiService};
use pr_reviewer::{GitHubClient, ReviewConfig, ReviewResult};

/// Shared state for all HTTP handlers.
///
/// The GitHub and inference clients are built once at startup so every
/// webhook delivery reuses the same connection pools.
pub struct AppState {
    pub config: ReviewConfig,
    pub github: GitHubClient,
    pub ai: GeminiService,
}

impl AppState {
    /// Builds the shared clients from a validated configuration.
    pub fn new(config: ReviewConfig) -> ReviewResult<Self> {
        let github = GitHubClient::new(
            config.github_api_base.clone(),
            config.github_token.clone(),
        )?;

        let mut ai_cfg = GeminiConfig::new(
            config.gemini_api_key.clone(),
            config.ai_model_name.clone(),
            config.request_timeout,
        );
        ai_cfg.max_output_tokens = config.ai_max_output_tokens;
        let ai = GeminiService::new(ai_cfg)?;

        Ok(Self { config, github, ai })
    }
}
