//! Gitea API response and request types.
//!
//! These types represent the raw JSON responses from the Gitea API (v1).
//! They are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Users and labels
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaLabel {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Pull requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaBranchInfo {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Gitea pull request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaPull {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// "open" or "closed".
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    pub head: GiteaBranchInfo,
    pub base: GiteaBranchInfo,
    #[serde(default)]
    pub labels: Vec<GiteaLabel>,
    #[serde(default)]
    pub requested_reviewers: Vec<GiteaUser>,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// Reviews and comments
// =============================================================================

/// A submitted review. `state` is "APPROVED", "REQUEST_CHANGES", "COMMENT"
/// or "PENDING".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaReview {
    pub id: i64,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// A diff-anchored comment, fetched per review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaReviewComment {
    pub id: i64,
    pub body: String,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    #[serde(default)]
    pub path: Option<String>,
    /// Position in the new file; zero or absent for old-side comments.
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub original_position: Option<u64>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaIssueComment {
    pub id: i64,
    pub body: String,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// =============================================================================
// Files, commits, statuses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaFile {
    pub filename: String,
    #[serde(default)]
    pub previous_filename: Option<String>,
    /// added / changed / deleted / renamed
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

fn default_status() -> String {
    "changed".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaCommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaCommitDetail {
    pub message: String,
    #[serde(default)]
    pub author: Option<GiteaCommitAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaCommitEntry {
    pub sha: String,
    pub commit: GiteaCommitDetail,
    #[serde(default)]
    pub author: Option<GiteaUser>,
}

/// Single commit with its affected files, from the git commits endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommitWithFiles {
    #[serde(default)]
    pub files: Vec<GiteaFile>,
}

/// Commit status. `status` is "pending", "success", "error", "failure" or
/// "warning".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaStatus {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateReviewRequest<'a> {
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<ReviewCommentInput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ReviewCommentInput<'a> {
    pub path: &'a str,
    pub body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_position: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateIssueCommentRequest<'a> {
    pub body: &'a str,
}

/// Merge request body; Gitea names the strategy field `Do`.
#[derive(Debug, Serialize)]
pub struct MergeRequestBody {
    #[serde(rename = "Do")]
    pub strategy: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RequestReviewersBody<'a> {
    pub reviewers: &'a [String],
}

/// Labels are attached by numeric id, not name.
#[derive(Debug, Serialize)]
pub struct AddLabelsBody {
    pub labels: Vec<i64>,
}
