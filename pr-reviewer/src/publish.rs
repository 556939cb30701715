//! Publishing review results back to the pull request.
//!
//! Each finding is posted as its own inline comment so a single bad
//! anchor never sinks the rest of the review. Failures are counted and
//! surfaced in the summary instead of aborting the run. The tracking
//! label is applied last and only if it is not already present.

use tracing::{debug, warn};

use crate::collect::CollectedChanges;
use crate::config::ReviewConfig;
use crate::errors::{Error, ReviewResult};
use crate::findings::{ParsedReview, ReviewFinding, Severity};
use crate::github::{GitHubClient, ReviewCommentDraft};
use crate::prompt::ComposedPrompt;
use crate::retry;

const BOT_FOOTER: &str = "\n\n<sub>Automated review bot</sub>";

/// What actually landed on the pull request.
#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    pub comments_posted: usize,
    pub comments_failed: usize,
    pub summary_posted: bool,
    pub label_applied: bool,
}

impl ReviewOutcome {
    /// Full success: every inline comment landed.
    pub fn success(&self) -> bool {
        self.comments_failed == 0
    }
}

/// Posts the parsed review to the PR: inline comments, an optional
/// summary comment, and the tracking label.
pub async fn publish_review(
    cfg: &ReviewConfig,
    gh: &GitHubClient,
    repo: &str,
    pr_number: u64,
    commit_id: &str,
    parsed: &ParsedReview,
    changes: &CollectedChanges,
    prompt: &ComposedPrompt,
) -> ReviewResult<ReviewOutcome> {
    let policy = cfg.retry_policy();
    let mut outcome = ReviewOutcome::default();

    if let ParsedReview::Structured(findings) = parsed {
        for finding in findings {
            let draft = ReviewCommentDraft {
                commit_id: commit_id.to_string(),
                path: finding.path.clone(),
                line: finding.line,
                side: "RIGHT",
                body: comment_body(finding),
            };
            let posted = retry::run(policy, "create_review_comment", || {
                gh.create_review_comment(repo, pr_number, &draft)
            })
            .await;
            match posted {
                Ok(()) => outcome.comments_posted += 1,
                Err(err) => {
                    outcome.comments_failed += 1;
                    let err = Error::from_retry("create_review_comment", err);
                    warn!(
                        path = %finding.path,
                        line = finding.line,
                        "inline comment failed: {err}"
                    );
                }
            }
        }
    }

    if let Some(body) = summary_body(parsed, changes, prompt, &outcome) {
        let posted = retry::run(policy, "post_issue_comment", || {
            gh.post_issue_comment(repo, pr_number, &body)
        })
        .await;
        match posted {
            Ok(()) => outcome.summary_posted = true,
            Err(err) => {
                let err = Error::from_retry("post_issue_comment", err);
                warn!("summary comment failed: {err}");
            }
        }
    }

    outcome.label_applied = apply_label(gh, repo, pr_number, &cfg.review_label, policy).await;

    Ok(outcome)
}

fn comment_body(finding: &ReviewFinding) -> String {
    format!(
        "{} **{}**: {}{BOT_FOOTER}",
        finding.severity.emoji(),
        finding.severity.as_str(),
        finding.body
    )
}

/// A conversation-level summary is posted when there is anything the
/// inline comments alone do not convey. A clean structured review with
/// full coverage needs none.
fn summary_body(
    parsed: &ParsedReview,
    changes: &CollectedChanges,
    prompt: &ComposedPrompt,
    outcome: &ReviewOutcome,
) -> Option<String> {
    let mut notes: Vec<String> = Vec::new();

    match parsed {
        ParsedReview::Fallback(raw) => {
            notes.push(format!(
                "The reply could not be parsed into inline comments; full review below.\n\n## Review\n\n{raw}"
            ));
        }
        ParsedReview::Structured(findings) if findings.is_empty() => {
            notes.push("No issues found in this change. 👍".to_string());
        }
        ParsedReview::Structured(_) => {}
    }

    if outcome.comments_failed > 0 {
        notes.push(format!(
            "{} inline comment(s) could not be posted.",
            outcome.comments_failed
        ));
    }
    if !changes.omitted.is_empty() {
        notes.push(format!(
            "Not reviewed (file limit): {}.",
            changes.omitted.join(", ")
        ));
    }
    if !prompt.evicted.is_empty() {
        notes.push(format!(
            "Not reviewed (size limit): {}.",
            prompt.evicted.join(", ")
        ));
    }
    if !changes.degraded.is_empty() {
        notes.push(format!(
            "Reviewed without file context: {}.",
            changes.degraded.join(", ")
        ));
    }

    if notes.is_empty() {
        return None;
    }
    Some(format!("{}{BOT_FOOTER}", notes.join("\n\n")))
}

/// Label application is additive on GitHub's side, so the current label
/// set is checked first. Any failure here is logged and swallowed.
async fn apply_label(
    gh: &GitHubClient,
    repo: &str,
    pr_number: u64,
    label: &str,
    policy: crate::retry::RetryPolicy,
) -> bool {
    let existing = retry::run(policy, "list_labels", || gh.list_labels(repo, pr_number)).await;
    match existing {
        Ok(labels) if !needs_label(&labels, label) => {
            debug!(label, "label already present");
            return true;
        }
        Ok(_) => {}
        Err(err) => {
            let err = Error::from_retry("list_labels", err);
            warn!("label listing failed: {err}");
            return false;
        }
    }

    match retry::run(policy, "add_label", || gh.add_label(repo, pr_number, label)).await {
        Ok(()) => true,
        Err(err) => {
            let err = Error::from_retry("add_label", err);
            warn!(label, "label application failed: {err}");
            false
        }
    }
}

/// True when the PR does not yet carry the label.
fn needs_label(existing: &[crate::github::Label], label: &str) -> bool {
    !existing.iter().any(|l| l.name == label)
}
