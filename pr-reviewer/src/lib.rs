//! Pull request review pipeline.
//!
//! Given a qualified trigger (a PR webhook event or a `/review` command),
//! the pipeline fetches the PR metadata, collects the diff with file
//! context, composes a single prompt, runs it through the inference
//! service, and publishes the parsed findings back to the pull request.
//!
//! Steps and their timings are logged at `debug`; the run's outcome at
//! `info`. Every outbound call goes through the retry executor.

pub mod collect;
pub mod config;
pub mod diff;
pub mod errors;
pub mod findings;
pub mod github;
pub mod prompt;
pub mod publish;
pub mod repo_config;
pub mod retry;

use std::time::Instant;

use tracing::{debug, info, warn};

use gemini_service::GeminiService;

pub use config::ReviewConfig;
pub use errors::{ConfigError, Error, GithubError, ReviewResult};
pub use github::GitHubClient;
pub use publish::ReviewOutcome;
pub use repo_config::RepoConfig;

/// How a review run was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// PR lifecycle webhook (opened, synchronize, reopened).
    Automatic,
    /// `/review` command in a PR comment.
    ManualCommand,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Automatic => "automatic",
            TriggerSource::ManualCommand => "manual",
        }
    }
}

/// A qualified request to review one pull request.
#[derive(Debug, Clone)]
pub struct ReviewTrigger {
    /// `owner/name` repository slug.
    pub repo: String,
    pub pr_number: u64,
    /// Webhook action that produced the trigger, for logging.
    pub action: String,
    pub source: TriggerSource,
}

/// Runs the full review pipeline for one trigger.
///
/// Returns `Ok(None)` when the run was skipped (closed PR, empty diff)
/// and `Ok(Some(outcome))` when a review was published.
pub async fn run_review(
    cfg: &ReviewConfig,
    gh: &GitHubClient,
    ai: &GeminiService,
    trigger: &ReviewTrigger,
) -> ReviewResult<Option<ReviewOutcome>> {
    let run_started = Instant::now();
    info!(
        repo = %trigger.repo,
        pr = trigger.pr_number,
        action = %trigger.action,
        source = trigger.source.as_str(),
        "review run started"
    );
    let policy = cfg.retry_policy();

    // Step 0: PR metadata. Guards against races where the PR closed
    // between the webhook delivery and this run.
    let step = Instant::now();
    let pr = retry::run(policy, "get_pull_request", || {
        gh.get_pull_request(&trigger.repo, trigger.pr_number)
    })
    .await
    .map_err(|e| Error::from_retry("get_pull_request", e))?;
    debug!(elapsed = ?step.elapsed(), sha = %pr.head.sha, "step 0: metadata fetched");

    if pr.state != "open" {
        info!(
            repo = %trigger.repo,
            pr = trigger.pr_number,
            state = %pr.state,
            "review skipped: pull request is not open"
        );
        return Ok(None);
    }

    // Step 1: per-repo config, then diff + context collection.
    let step = Instant::now();
    let repo_cfg =
        repo_config::fetch_repo_config(policy, gh, &trigger.repo, &pr.head.sha).await;
    let changes = collect::collect_changes(
        cfg,
        &repo_cfg,
        gh,
        &trigger.repo,
        trigger.pr_number,
        &pr.head.sha,
    )
    .await?;
    debug!(
        elapsed = ?step.elapsed(),
        files = changes.files.len(),
        omitted = changes.omitted.len(),
        degraded = changes.degraded.len(),
        "step 1: changes collected"
    );

    if changes.files.is_empty() {
        info!(
            repo = %trigger.repo,
            pr = trigger.pr_number,
            "review skipped: no reviewable changes"
        );
        return Ok(None);
    }

    // Step 2: prompt composition.
    let step = Instant::now();
    let composed = prompt::compose_prompt(
        &changes,
        repo_cfg.language(cfg),
        cfg.max_prompt_length,
        repo_cfg.custom_prompt.as_deref(),
    );
    if !composed.evicted.is_empty() {
        warn!(
            evicted = composed.evicted.len(),
            "prompt ceiling evicted file sections"
        );
    }
    debug!(
        elapsed = ?step.elapsed(),
        chars = composed.text.chars().count(),
        "step 2: prompt composed"
    );

    // Step 3: inference.
    let step = Instant::now();
    let reply = retry::run(policy, "generate", || ai.generate(&composed.text))
        .await
        .map_err(|e| Error::from_retry("generate", e))?;
    let parsed = findings::parse_review(&reply);
    if let findings::ParsedReview::Fallback(_) = &parsed {
        warn!("model reply did not match the output contract, using fallback");
    }
    debug!(elapsed = ?step.elapsed(), model = ai.model(), "step 3: review generated");

    // Step 4: publish.
    let step = Instant::now();
    let outcome = publish::publish_review(
        cfg,
        gh,
        &trigger.repo,
        trigger.pr_number,
        &pr.head.sha,
        &parsed,
        &changes,
        &composed,
    )
    .await?;
    debug!(elapsed = ?step.elapsed(), "step 4: review published");

    info!(
        repo = %trigger.repo,
        pr = trigger.pr_number,
        success = outcome.success(),
        comments = outcome.comments_posted,
        failed = outcome.comments_failed,
        summary = outcome.summary_posted,
        label = outcome.label_applied,
        elapsed = ?run_started.elapsed(),
        "review run finished"
    );
    Ok(Some(outcome))
}
