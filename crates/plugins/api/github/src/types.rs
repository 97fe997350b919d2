//! GitHub API response and request types.
//!
//! These types represent the raw JSON responses from the GitHub REST API.
//! They are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// GitHub user representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// =============================================================================
// Pull request
// =============================================================================

/// Branch reference on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Label attached to an issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// GitHub pull request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPull {
    pub number: u64,
    pub node_id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// "open" or "closed"; merged PRs report "closed" plus `merged_at`.
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    pub head: GitHubRef,
    pub base: GitHubRef,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default)]
    pub changed_files: Option<u64>,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Issue-shaped item returned by the cross-repository search endpoint.
/// Branch refs are not included in search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSearchItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// Reviews and comments
// =============================================================================

/// A submitted or pending review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubReview {
    pub id: i64,
    pub node_id: String,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// A diff-anchored review comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubReviewComment {
    pub id: i64,
    pub body: String,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub in_reply_to_id: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A conversation-level issue comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssueComment {
    pub id: i64,
    pub body: String,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// =============================================================================
// Files, commits, checks
// =============================================================================

/// One file entry from the files or commit-diff endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubFile {
    pub filename: String,
    #[serde(default)]
    pub previous_filename: Option<String>,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    #[serde(default)]
    pub patch: Option<String>,
}

/// Commit author block inside the `commit` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitAuthor {
    #[serde(default)]
    pub date: Option<String>,
}

/// Nested commit payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitInner {
    pub message: String,
    #[serde(default)]
    pub author: Option<GitHubCommitAuthor>,
}

/// One entry of the PR commits listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitEntry {
    pub sha: String,
    pub commit: GitHubCommitInner,
    #[serde(default)]
    pub author: Option<GitHubUser>,
}

/// Response of `GET /commits/{sha}` (diff of a single commit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    pub sha: String,
    #[serde(default)]
    pub files: Vec<GitHubFile>,
}

/// One check run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCheckRun {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Response of the check-runs listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCheckRuns {
    pub total_count: u64,
    #[serde(default)]
    pub check_runs: Vec<GitHubCheckRun>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitReviewRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    pub event: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateIssueCommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewCommentRequest<'a> {
    pub body: &'a str,
    pub commit_id: &'a str,
    pub path: &'a str,
    pub line: u64,
    pub side: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MergeRequestBody<'a> {
    pub merge_method: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RequestReviewersBody<'a> {
    pub reviewers: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct AddLabelsBody<'a> {
    pub labels: &'a [String],
}
