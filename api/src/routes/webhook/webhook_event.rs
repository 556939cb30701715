//! GitHub webhook payload model and trigger qualification.
//!
//! Only the fields the dispatcher actually consults are deserialized;
//! everything else in the delivery is ignored. Qualification is a pure
//! function so it can be tested without a server.

use serde::Deserialize;

use pr_reviewer::{ReviewTrigger, TriggerSource};

/// PR actions that start a review automatically.
const AUTOMATIC_ACTIONS: [&str; 3] = ["opened", "synchronize", "reopened"];

/// Comment body that requests a review on demand.
const REVIEW_COMMAND: &str = "/review";

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub action: Option<String>,
    pub repository: Option<Repository>,
    pub pull_request: Option<PullRequestRef>,
    pub issue: Option<IssueRef>,
    pub comment: Option<CommentRef>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

/// `issue_comment` deliveries describe the PR through the issue object.
/// A plain issue has no `pull_request` key; the payload also carries the
/// issue state, which lets closed PRs be skipped without any API call.
#[derive(Debug, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub state: Option<String>,
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRef {
    pub body: Option<String>,
}

/// Decides whether a delivery starts a review run.
///
/// Returns `None` for everything that should be acknowledged and
/// ignored: foreign event types, uninteresting actions, comments that
/// are not the review command, plain issues, closed PRs, and
/// repositories outside the configured target.
pub fn qualify(
    event_type: &str,
    payload: &WebhookPayload,
    target_repository: Option<&str>,
) -> Option<ReviewTrigger> {
    let repo = payload.repository.as_ref()?.full_name.as_str();
    if let Some(target) = target_repository {
        if !repo.eq_ignore_ascii_case(target) {
            return None;
        }
    }
    let action = payload.action.as_deref()?;

    match event_type {
        "pull_request" => {
            if !AUTOMATIC_ACTIONS.contains(&action) {
                return None;
            }
            let pr = payload.pull_request.as_ref()?;
            Some(ReviewTrigger {
                repo: repo.to_string(),
                pr_number: pr.number,
                action: action.to_string(),
                source: TriggerSource::Automatic,
            })
        }
        "issue_comment" => {
            if action != "created" {
                return None;
            }
            let comment = payload.comment.as_ref()?;
            if comment.body.as_deref().map(str::trim) != Some(REVIEW_COMMAND) {
                return None;
            }
            let issue = payload.issue.as_ref()?;
            // Comments on plain issues carry no pull_request key.
            issue.pull_request.as_ref()?;
            if issue.state.as_deref() != Some("open") {
                return None;
            }
            Some(ReviewTrigger {
                repo: repo.to_string(),
                pr_number: issue.number,
                action: "comment".to_string(),
                source: TriggerSource::ManualCommand,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(v).unwrap()
    }

    fn pr_payload(action: &str) -> WebhookPayload {
        payload(json!({
            "action": action,
            "repository": { "full_name": "acme/rocket" },
            "pull_request": { "number": 42 }
        }))
    }

    fn comment_payload(body: &str, state: &str, on_pr: bool) -> WebhookPayload {
        let mut issue = json!({ "number": 7, "state": state });
        if on_pr {
            issue["pull_request"] = json!({ "url": "https://api.github.com/..." });
        }
        payload(json!({
            "action": "created",
            "repository": { "full_name": "acme/rocket" },
            "issue": issue,
            "comment": { "body": body }
        }))
    }

    #[test]
    fn pull_request_lifecycle_actions_qualify() {
        for action in ["opened", "synchronize", "reopened"] {
            let t = qualify("pull_request", &pr_payload(action), None).unwrap();
            assert_eq!(t.repo, "acme/rocket");
            assert_eq!(t.pr_number, 42);
            assert_eq!(t.source, TriggerSource::Automatic);
        }
    }

    #[test]
    fn other_pull_request_actions_are_ignored() {
        for action in ["closed", "labeled", "edited", "assigned"] {
            assert!(qualify("pull_request", &pr_payload(action), None).is_none());
        }
    }

    #[test]
    fn foreign_event_types_are_ignored() {
        assert!(qualify("push", &pr_payload("opened"), None).is_none());
        assert!(qualify("ping", &pr_payload("opened"), None).is_none());
    }

    #[test]
    fn review_command_on_an_open_pr_qualifies() {
        let t = qualify("issue_comment", &comment_payload("/review", "open", true), None).unwrap();
        assert_eq!(t.pr_number, 7);
        assert_eq!(t.source, TriggerSource::ManualCommand);
        assert_eq!(t.action, "comment");
    }

    #[test]
    fn review_command_tolerates_surrounding_whitespace_only() {
        assert!(
            qualify("issue_comment", &comment_payload("  /review \n", "open", true), None)
                .is_some()
        );
        assert!(
            qualify("issue_comment", &comment_payload("please /review", "open", true), None)
                .is_none()
        );
        assert!(
            qualify("issue_comment", &comment_payload("/reviews", "open", true), None).is_none()
        );
    }

    #[test]
    fn review_command_on_a_closed_pr_is_skipped_from_the_payload_alone() {
        assert!(
            qualify("issue_comment", &comment_payload("/review", "closed", true), None).is_none()
        );
    }

    #[test]
    fn review_command_on_a_plain_issue_is_ignored() {
        assert!(
            qualify("issue_comment", &comment_payload("/review", "open", false), None).is_none()
        );
    }

    #[test]
    fn target_repository_filter_is_case_insensitive() {
        let p = pr_payload("opened");
        assert!(qualify("pull_request", &p, Some("ACME/Rocket")).is_some());
        assert!(qualify("pull_request", &p, Some("acme/other")).is_none());
    }
}
