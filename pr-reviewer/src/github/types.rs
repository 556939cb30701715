//! Wire types for the slice of the GitHub REST API the pipeline touches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pull request metadata ("get a pull request").
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// "open" or "closed".
    pub state: String,
    pub title: String,
    pub head: GitRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Branch tip reference inside PR metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    pub sha: String,
    #[serde(rename = "ref")]
    pub branch: String,
}

/// One entry from "list pull request files".
#[derive(Debug, Clone, Deserialize)]
pub struct PrFile {
    pub filename: String,
    /// added | modified | removed | renamed | copied | changed | unchanged.
    pub status: String,
    /// Unified diff hunks; absent for binary and very large files.
    #[serde(default)]
    pub patch: Option<String>,
}

/// Response of the contents API for a single file.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsEntry {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A label attached to an issue/PR.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Body for "create a review comment for a pull request".
#[derive(Debug, Clone, Serialize)]
pub struct ReviewCommentDraft {
    pub commit_id: String,
    pub path: String,
    /// 1-based line in the new version of the file.
    pub line: u64,
    pub side: &'static str,
    pub body: String,
}
