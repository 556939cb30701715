//! Diff and context collection for one pull request.
//!
//! Produces the ordered, size-capped sequence of changed files the prompt
//! composer works from. Context enrichment is best-effort: a file whose
//! content cannot be fetched degrades to diff-only inclusion instead of
//! aborting the review.

use tracing::{debug, warn};

use crate::config::ReviewConfig;
use crate::diff::{HunkSpan, hunk_spans, looks_like_binary_patch};
use crate::errors::{Error, ReviewResult};
use crate::github::{GitHubClient, PrFile};
use crate::repo_config::RepoConfig;
use crate::retry;

/// What kind of change a file underwent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl ChangeKind {
    fn from_status(status: &str) -> Self {
        match status {
            "added" => ChangeKind::Added,
            "removed" => ChangeKind::Removed,
            "renamed" => ChangeKind::Renamed,
            _ => ChangeKind::Modified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
            ChangeKind::Renamed => "renamed",
        }
    }
}

/// A numbered excerpt of the file around one or more hunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// 1-based first line of the excerpt.
    pub start_line: usize,
    /// Numbered text, one `{lineno} | {content}` row per line.
    pub text: String,
}

/// Per-file context included alongside the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContext {
    /// Diff only; no content was requested or available.
    None,
    /// Whole file, numbered (fits under the line cap).
    Full(String),
    /// Windows around each changed hunk (file exceeded the line cap).
    Windowed(Vec<Snippet>),
}

/// One changed file, enriched and ready for prompting.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub patch: String,
    pub kind: ChangeKind,
    pub context: FileContext,
}

/// Everything the collector produced for one PR.
#[derive(Debug, Clone, Default)]
pub struct CollectedChanges {
    pub files: Vec<ChangedFile>,
    /// Paths dropped by the file cap, disclosed to reviewers later.
    pub omitted: Vec<String>,
    /// Paths whose context fetch failed; included diff-only.
    pub degraded: Vec<String>,
}

/// Lists the PR's changed files and enriches each with file context
/// according to the configuration.
pub async fn collect_changes(
    cfg: &ReviewConfig,
    repo_cfg: &RepoConfig,
    gh: &GitHubClient,
    repo: &str,
    pr_number: u64,
    head_sha: &str,
) -> ReviewResult<CollectedChanges> {
    let policy = cfg.retry_policy();

    let listed = retry::run(policy, "list_pr_files", || gh.list_pr_files(repo, pr_number))
        .await
        .map_err(|e| Error::from_retry("list_pr_files", e))?;

    let in_scope = apply_path_filters(listed, repo_cfg);
    let (kept, omitted) = apply_file_cap(in_scope, cfg.max_files_per_review);
    if !omitted.is_empty() {
        debug!(
            omitted = omitted.len(),
            cap = cfg.max_files_per_review,
            "changed files exceed the review cap"
        );
    }

    let mut files = Vec::with_capacity(kept.len());
    let mut degraded = Vec::new();

    for f in kept {
        let kind = ChangeKind::from_status(&f.status);
        let patch = f.patch.unwrap_or_default();
        let path = f.filename;

        let wants_context = cfg.include_file_context
            && kind != ChangeKind::Removed
            && !patch.is_empty()
            && !looks_like_binary_patch(&patch);

        let context = if !wants_context {
            FileContext::None
        } else {
            match retry::run(policy, "get_file_content", || {
                gh.get_file_content(repo, &path, head_sha)
            })
            .await
            {
                Ok(Some(content)) => build_context(
                    &content,
                    &patch,
                    cfg.context_max_lines,
                    cfg.context_surrounding_lines,
                ),
                Ok(None) => {
                    debug!(%path, "no content at head ref, keeping diff only");
                    FileContext::None
                }
                Err(e) => {
                    warn!(
                        %path,
                        error = %Error::from_retry("get_file_content", e),
                        "context fetch failed, degrading to diff-only"
                    );
                    degraded.push(path.clone());
                    FileContext::None
                }
            }
        };

        files.push(ChangedFile {
            path,
            patch,
            kind,
            context,
        });
    }

    Ok(CollectedChanges {
        files,
        omitted,
        degraded,
    })
}

/// Drops files the repository's config puts out of scope.
fn apply_path_filters(files: Vec<PrFile>, repo_cfg: &RepoConfig) -> Vec<PrFile> {
    files
        .into_iter()
        .filter(|f| {
            let allowed = repo_cfg.allows(&f.filename);
            if !allowed {
                debug!(path = %f.filename, "out of scope per repo config");
            }
            allowed
        })
        .collect()
}

/// Keeps the first `cap` files in listing order; the rest become omissions.
fn apply_file_cap(files: Vec<PrFile>, cap: usize) -> (Vec<PrFile>, Vec<String>) {
    let mut files = files;
    if files.len() <= cap {
        return (files, Vec::new());
    }
    let rest = files.split_off(cap);
    let omitted = rest.into_iter().map(|f| f.filename).collect();
    (files, omitted)
}

/// Picks full-file or windowed context based on the line cap.
pub(crate) fn build_context(
    content: &str,
    patch: &str,
    max_lines: usize,
    surrounding: usize,
) -> FileContext {
    let total = content.lines().count();
    if total <= max_lines {
        return FileContext::Full(render_numbered(content, 1, total));
    }
    let snippets = window_snippets(content, &hunk_spans(patch), surrounding);
    if snippets.is_empty() {
        FileContext::None
    } else {
        FileContext::Windowed(snippets)
    }
}

/// Cuts a padded, merged window around each hunk span.
fn window_snippets(content: &str, spans: &[HunkSpan], pad: usize) -> Vec<Snippet> {
    let total = content.lines().count();
    if total == 0 {
        return Vec::new();
    }

    // Inclusive 1-based bounds, clamped to the file.
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        let start = span.new_start.max(1) as usize;
        let end = start + (span.new_lines.max(1) as usize) - 1;
        let s = start.saturating_sub(pad).max(1);
        let e = (end + pad).min(total);
        match windows.last_mut() {
            // Merge touching/overlapping windows into one snippet.
            Some((_, prev_end)) if s <= *prev_end + 1 => *prev_end = (*prev_end).max(e),
            _ => windows.push((s, e)),
        }
    }

    windows
        .into_iter()
        .map(|(s, e)| Snippet {
            start_line: s,
            text: render_numbered(content, s, e),
        })
        .collect()
}

/// Renders numbered lines from `from..=to` (1-based inclusive).
fn render_numbered(content: &str, from: usize, to: usize) -> String {
    let mut out = String::new();
    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        if lineno >= from && lineno <= to {
            out.push_str(&format!("{:>6} | {}\n", lineno, line));
        }
    }
    out
}
