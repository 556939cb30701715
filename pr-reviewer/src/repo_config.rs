//! Per-repository review configuration.
//!
//! Repositories can carry a `.pr-review-bot.yml` at the head SHA to scope
//! the review to certain paths, pick a review language, or replace the
//! default instructions. Loading is best-effort: a missing, unreadable or
//! malformed file falls back to the defaults and never fails the run.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ReviewConfig;
use crate::errors::Error;
use crate::github::GitHubClient;
use crate::retry::{self, RetryPolicy};

/// Well-known config file path inside the target repository.
pub const CONFIG_FILE_PATH: &str = ".pr-review-bot.yml";

/// Settings a repository may override for its own reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Path prefixes excluded from review.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    /// When non-empty, only paths under these prefixes are reviewed.
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Overrides `OUTPUT_LANGUAGE` for this repository.
    #[serde(default)]
    pub review_language: Option<String>,
    /// Replaces the built-in review instructions.
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

impl RepoConfig {
    /// Whether a changed file at `path` is in scope for review.
    /// Exclusions win over inclusions; an empty include list means "all".
    pub fn allows(&self, path: &str) -> bool {
        if self.exclude_paths.iter().any(|p| path.starts_with(p)) {
            return false;
        }
        if !self.include_paths.is_empty() {
            return self.include_paths.iter().any(|p| path.starts_with(p));
        }
        true
    }

    /// Review language for this repository, falling back to the global one.
    pub fn language<'a>(&'a self, cfg: &'a ReviewConfig) -> &'a str {
        self.review_language
            .as_deref()
            .unwrap_or(&cfg.output_language)
    }
}

/// Fetches and parses the repository's config file at the head SHA.
/// Any failure yields the defaults with a warning.
pub async fn fetch_repo_config(
    policy: RetryPolicy,
    gh: &GitHubClient,
    repo: &str,
    head_sha: &str,
) -> RepoConfig {
    let fetched = retry::run(policy, "get_repo_config", || {
        gh.get_file_content(repo, CONFIG_FILE_PATH, head_sha)
    })
    .await;

    match fetched {
        Ok(Some(text)) => parse_repo_config(&text),
        Ok(None) => {
            debug!(repo, "no {CONFIG_FILE_PATH}, using defaults");
            RepoConfig::default()
        }
        Err(err) => {
            let err = Error::from_retry("get_repo_config", err);
            warn!(repo, "could not load {CONFIG_FILE_PATH}: {err}");
            RepoConfig::default()
        }
    }
}

fn parse_repo_config(text: &str) -> RepoConfig {
    if text.trim().is_empty() {
        return RepoConfig::default();
    }
    match serde_yaml::from_str(text) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("malformed {CONFIG_FILE_PATH}, using defaults: {err}");
            RepoConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let cfg = parse_repo_config(
            "\
exclude_paths:
  - src/docs
  - tests/
include_paths:
  - src/
review_language: chinese
custom_prompt: \"Focus on error handling in {filename}.\"
",
        );
        assert_eq!(cfg.exclude_paths, vec!["src/docs", "tests/"]);
        assert_eq!(cfg.include_paths, vec!["src/"]);
        assert_eq!(cfg.review_language.as_deref(), Some("chinese"));
        assert!(cfg.custom_prompt.unwrap().contains("error handling"));
    }

    #[test]
    fn empty_or_malformed_yaml_falls_back_to_defaults() {
        assert_eq!(parse_repo_config(""), RepoConfig::default());
        assert_eq!(parse_repo_config("\n  \n"), RepoConfig::default());
        assert_eq!(
            parse_repo_config("exclude_paths: {not: [a, list"),
            RepoConfig::default()
        );
        // Unknown keys are treated as a malformed file, not silently dropped.
        assert_eq!(
            parse_repo_config("exclud_paths:\n  - typo/\n"),
            RepoConfig::default()
        );
    }

    #[test]
    fn exclusions_win_over_inclusions() {
        let cfg = RepoConfig {
            exclude_paths: vec!["src/generated/".into()],
            include_paths: vec!["src/".into()],
            ..RepoConfig::default()
        };
        assert!(cfg.allows("src/main.rs"));
        assert!(!cfg.allows("src/generated/schema.rs"));
        assert!(!cfg.allows("docs/readme.md"));
    }

    #[test]
    fn empty_include_list_allows_everything_not_excluded() {
        let cfg = RepoConfig {
            exclude_paths: vec!["vendor/".into()],
            ..RepoConfig::default()
        };
        assert!(cfg.allows("src/lib.rs"));
        assert!(cfg.allows("README.md"));
        assert!(!cfg.allows("vendor/dep.rs"));
    }
}
