//! Immutable runtime configuration, loaded once from the environment.
//!
//! Validation is eager and aggregated: one [`ConfigError`] lists every
//! missing or malformed variable instead of failing on the first.

use std::time::Duration;

use crate::errors::ConfigError;
use crate::retry::RetryPolicy;

/// Default API base for GitHub.
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Everything the pipeline and HTTP surface read at runtime.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub github_token: String,
    pub gemini_api_key: String,
    pub github_api_base: String,
    pub ai_model_name: String,
    pub review_label: String,
    pub max_prompt_length: usize,
    pub include_file_context: bool,
    pub context_max_lines: usize,
    pub context_surrounding_lines: usize,
    pub max_files_per_review: usize,
    pub output_language: String,
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub host: String,
    pub port: u16,
    /// HMAC secret for webhook signatures; verification is skipped when unset.
    pub webhook_secret: Option<String>,
    /// Optional "owner/name" filter; events from other repos are ignored.
    pub target_repository: Option<String>,
    pub ai_max_output_tokens: Option<u32>,
}

impl ReviewConfig {
    /// Loads and validates the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ReviewConfig::from_env`] but with an injectable lookup,
    /// so tests never have to mutate process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        let github_token = required(&lookup, &mut problems, "GITHUB_TOKEN");
        let gemini_api_key = required(&lookup, &mut problems, "GEMINI_API_KEY");

        let github_api_base = optional(&lookup, "GITHUB_API_BASE")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());
        let ai_model_name =
            optional(&lookup, "AI_MODEL_NAME").unwrap_or_else(|| "gemini-1.5-pro-latest".into());
        let review_label = optional(&lookup, "REVIEW_LABEL").unwrap_or_else(|| "ai-reviewed".into());
        let output_language =
            optional(&lookup, "OUTPUT_LANGUAGE").unwrap_or_else(|| "english".into());
        let host = optional(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".into());

        let max_prompt_length =
            parse_num(&lookup, &mut problems, "MAX_PROMPT_LENGTH", 200_000usize);
        let include_file_context = parse_bool(&lookup, &mut problems, "INCLUDE_FILE_CONTEXT", true);
        let context_max_lines = parse_num(&lookup, &mut problems, "CONTEXT_MAX_LINES", 400usize);
        let context_surrounding_lines =
            parse_num(&lookup, &mut problems, "CONTEXT_SURROUNDING_LINES", 50usize);
        let max_files_per_review =
            parse_num(&lookup, &mut problems, "MAX_FILES_PER_REVIEW", 50usize);
        let max_retry_attempts = parse_num(&lookup, &mut problems, "MAX_RETRY_ATTEMPTS", 3u32);
        let retry_delay_secs = parse_num(&lookup, &mut problems, "RETRY_DELAY", 2.0f64);
        let request_timeout_secs = parse_num(&lookup, &mut problems, "REQUEST_TIMEOUT", 60u64);
        let port = parse_num(&lookup, &mut problems, "PORT", 8080u16);

        let webhook_secret = optional(&lookup, "GITHUB_WEBHOOK_SECRET");
        let target_repository = optional(&lookup, "TARGET_REPOSITORY");
        let ai_max_output_tokens = match optional(&lookup, "AI_MAX_OUTPUT_TOKENS") {
            None => None,
            Some(raw) => match raw.parse::<u32>() {
                Ok(v) => Some(v),
                Err(_) => {
                    problems.push("AI_MAX_OUTPUT_TOKENS: expected an unsigned integer".into());
                    None
                }
            },
        };

        if max_files_per_review == 0 {
            problems.push("MAX_FILES_PER_REVIEW must be at least 1".into());
        }
        // The static instructions alone take a few thousand characters; a
        // smaller ceiling could never hold a well-formed prompt.
        if max_prompt_length < 4_000 {
            problems.push("MAX_PROMPT_LENGTH must be at least 4000".into());
        }
        if max_retry_attempts == 0 {
            problems.push("MAX_RETRY_ATTEMPTS must be at least 1".into());
        }
        if !(retry_delay_secs.is_finite() && retry_delay_secs >= 0.0) {
            problems.push("RETRY_DELAY must be a non-negative number of seconds".into());
        }
        if request_timeout_secs == 0 {
            problems.push("REQUEST_TIMEOUT must be at least 1 second".into());
        }

        if !problems.is_empty() {
            return Err(ConfigError::Invalid { problems });
        }

        Ok(Self {
            github_token,
            gemini_api_key,
            github_api_base,
            ai_model_name,
            review_label,
            max_prompt_length,
            include_file_context,
            context_max_lines,
            context_surrounding_lines,
            max_files_per_review,
            output_language,
            max_retry_attempts,
            retry_delay: Duration::from_secs_f64(retry_delay_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            host,
            port,
            webhook_secret,
            target_repository,
            ai_max_output_tokens,
        })
    }

    /// Retry policy shared by every outbound call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            delay: self.retry_delay,
            timeout: self.request_timeout,
        }
    }
}

fn required<F>(lookup: &F, problems: &mut Vec<String>, name: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            problems.push(format!("{name} is required"));
            String::new()
        }
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parse_num<F, T>(lookup: &F, problems: &mut Vec<String>, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match optional(lookup, name) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                problems.push(format!("{name}: could not parse {raw:?} as a number"));
                default
            }
        },
    }
}

fn parse_bool<F>(lookup: &F, problems: &mut Vec<String>, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, name) {
        None => default,
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                problems.push(format!("{name}: could not parse {other:?} as a boolean"));
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| map.get(name).map(|v| v.to_string())
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![("GITHUB_TOKEN", "ghp_x"), ("GEMINI_API_KEY", "AIza_x")]
    }

    #[test]
    fn all_missing_required_vars_reported_in_one_error() {
        let err = ReviewConfig::from_lookup(env(&[])).unwrap_err();
        let ConfigError::Invalid { problems } = err;
        assert!(problems.iter().any(|p| p.contains("GITHUB_TOKEN")));
        assert!(problems.iter().any(|p| p.contains("GEMINI_API_KEY")));
    }

    #[test]
    fn defaults_apply_when_optionals_are_unset() {
        let cfg = ReviewConfig::from_lookup(env(&base_env())).unwrap();
        assert_eq!(cfg.ai_model_name, "gemini-1.5-pro-latest");
        assert_eq!(cfg.max_files_per_review, 50);
        assert_eq!(cfg.max_prompt_length, 200_000);
        assert_eq!(cfg.output_language, "english");
        assert_eq!(cfg.retry_delay, Duration::from_secs(2));
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
        assert_eq!(cfg.port, 8080);
        assert!(cfg.include_file_context);
        assert!(cfg.webhook_secret.is_none());
    }

    #[test]
    fn malformed_numbers_and_bounds_are_aggregated() {
        let mut pairs = base_env();
        pairs.push(("MAX_FILES_PER_REVIEW", "zero"));
        pairs.push(("MAX_RETRY_ATTEMPTS", "0"));
        let err = ReviewConfig::from_lookup(env(&pairs)).unwrap_err();
        let ConfigError::Invalid { problems } = err;
        assert!(problems.iter().any(|p| p.contains("MAX_FILES_PER_REVIEW")));
        assert!(problems.iter().any(|p| p.contains("MAX_RETRY_ATTEMPTS")));
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        let mut pairs = base_env();
        pairs.push(("INCLUDE_FILE_CONTEXT", "off"));
        let cfg = ReviewConfig::from_lookup(env(&pairs)).unwrap();
        assert!(!cfg.include_file_context);
    }

    #[test]
    fn prompt_ceiling_floor_is_enforced() {
        let mut pairs = base_env();
        pairs.push(("MAX_PROMPT_LENGTH", "100"));
        assert!(ReviewConfig::from_lookup(env(&pairs)).is_err());
    }
}
