//! GitHub REST client for one repository's pull requests.
//!
//! Plain struct with plain async fns over a shared `reqwest` instance; all
//! methods return [`GithubError`] so the retry executor can classify the
//! failure. Endpoints used:
//! - GET  /repos/{owner}/{repo}/pulls/{number}
//! - GET  /repos/{owner}/{repo}/pulls/{number}/files
//! - GET  /repos/{owner}/{repo}/contents/{path}?ref=...
//! - POST /repos/{owner}/{repo}/pulls/{number}/comments
//! - POST /repos/{owner}/{repo}/issues/{number}/comments
//! - GET/POST /repos/{owner}/{repo}/issues/{number}/labels

pub mod types;
pub use types::*;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::errors::GithubError;

const FILES_PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl GitHubClient {
    /// Constructs a client with a dedicated reqwest instance and auth token.
    pub fn new(base_api: String, token: String) -> Result<Self, GithubError> {
        let http = Client::builder().user_agent("pr-review-bot/0.1").build()?;
        Ok(Self {
            http,
            base_api,
            token,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    /// Fetches PR metadata (state, head SHA).
    pub async fn get_pull_request(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GithubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.base_api, repo, number);
        let pr: PullRequest = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(pr)
    }

    /// Lists every changed file of the PR, following pagination.
    pub async fn list_pr_files(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PrFile>, GithubError> {
        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repos/{}/pulls/{}/files?per_page={}&page={}",
                self.base_api, repo, number, FILES_PER_PAGE, page
            );
            let batch: Vec<PrFile> = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let got = batch.len();
            files.extend(batch);
            if got < FILES_PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(repo, number, files = files.len(), "listed pr files");
        Ok(files)
    }

    /// Fetches decoded text content of a file at a git ref.
    ///
    /// Returns `Ok(None)` when the file does not exist at that ref.
    pub async fn get_file_content(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, GithubError> {
        let url = format!(
            "{}/repos/{}/contents/{}?ref={}",
            self.base_api,
            repo,
            encode_path(path),
            git_ref
        );
        let resp = self.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let entry: ContentsEntry = resp.error_for_status()?.json().await?;

        match entry.encoding.as_deref() {
            Some("base64") => {
                let packed: String = entry
                    .content
                    .unwrap_or_default()
                    .split_whitespace()
                    .collect();
                let bytes = BASE64
                    .decode(packed)
                    .map_err(|e| GithubError::InvalidResponse(format!("bad base64: {e}")))?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    GithubError::InvalidResponse(format!("non-utf8 content: {path}"))
                })?;
                Ok(Some(text))
            }
            _ => Ok(entry.content),
        }
    }

    /// Posts one inline review comment anchored to a diff line.
    pub async fn create_review_comment(
        &self,
        repo: &str,
        number: u64,
        draft: &ReviewCommentDraft,
    ) -> Result<(), GithubError> {
        let url = format!("{}/repos/{}/pulls/{}/comments", self.base_api, repo, number);
        self.post(&url)
            .json(draft)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Posts a regular (non-inline) comment on the PR conversation.
    pub async fn post_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), GithubError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.base_api, repo, number);
        self.post(&url)
            .json(&json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Lists labels currently on the PR.
    pub async fn list_labels(&self, repo: &str, number: u64) -> Result<Vec<Label>, GithubError> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.base_api, repo, number);
        let labels: Vec<Label> = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(labels)
    }

    /// Adds a label to the PR. GitHub's endpoint is additive, so callers
    /// check [`GitHubClient::list_labels`] first to stay idempotent.
    pub async fn add_label(&self, repo: &str, number: u64, label: &str) -> Result<(), GithubError> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.base_api, repo, number);
        self.post(&url)
            .json(&json!({ "labels": [label] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Percent-encodes each path segment while keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_encoded_separators_kept() {
        assert_eq!(encode_path("src/lib.rs"), "src/lib.rs");
        assert_eq!(encode_path("docs/my notes.md"), "docs/my%20notes.md");
    }
}
