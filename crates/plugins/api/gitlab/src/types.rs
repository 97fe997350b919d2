//! GitLab API response and request types.
//!
//! These types represent the raw JSON responses from the GitLab REST API
//! (v4). They are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// GitLab user representation. `username` is the stable handle; `name` is
/// the display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// =============================================================================
// Merge request
// =============================================================================

/// Shas anchoring the MR's current diff version; required for positioned
/// discussion creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabDiffRefs {
    pub base_sha: String,
    pub head_sha: String,
    pub start_sha: String,
}

/// GitLab merge request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// "opened", "closed", "merged" or "locked".
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Head sha; absent on some list endpoints.
    #[serde(default)]
    pub sha: Option<String>,
    /// Only present on single-MR responses.
    #[serde(default)]
    pub diff_refs: Option<GitLabDiffRefs>,
    /// GitLab reports this as a string like "12" or "20+".
    #[serde(default)]
    pub changes_count: Option<String>,
    pub web_url: String,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// Notes and discussions
// =============================================================================

/// Diff position attached to a `DiffNote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabNotePosition {
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_line: Option<u64>,
    #[serde(default)]
    pub old_line: Option<u64>,
}

/// A note: GitLab's comment primitive. Both general MR comments and
/// diff-anchored comments are notes; the latter carry a `position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabNote {
    pub id: i64,
    pub body: String,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub position: Option<GitLabNotePosition>,
    #[serde(default)]
    pub resolvable: bool,
    #[serde(default)]
    pub resolved: Option<bool>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A discussion: an ordered group of notes, the closest GitLab gets to a
/// review thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabDiscussion {
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    #[serde(default)]
    pub notes: Vec<GitLabNote>,
}

// =============================================================================
// Diffs, commits, pipelines, approvals
// =============================================================================

/// One file's diff from the MR diffs or commit diff endpoints. GitLab does
/// not report per-file addition/deletion counts here; they are derived from
/// the unified diff text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabDiff {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
    #[serde(default)]
    pub diff: String,
}

/// One entry of the MR commits listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub authored_date: Option<String>,
}

/// One pipeline attached to the MR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabPipeline {
    pub id: u64,
    /// "pending", "running", "success", "failed", "canceled", "skipped".
    pub status: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabApprovedBy {
    pub user: GitLabUser,
}

/// Response of the MR approvals endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabApprovals {
    #[serde(default)]
    pub approved_by: Vec<GitLabApprovedBy>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateNoteRequest<'a> {
    pub body: &'a str,
}

/// Position payload for a positioned discussion. Exactly one of `new_line`
/// and `old_line` is set, depending on the diff side.
#[derive(Debug, Serialize)]
pub struct DiscussionPosition<'a> {
    pub position_type: &'static str,
    pub base_sha: &'a str,
    pub head_sha: &'a str,
    pub start_sha: &'a str,
    pub new_path: &'a str,
    pub old_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateDiscussionRequest<'a> {
    pub body: &'a str,
    pub position: DiscussionPosition<'a>,
}

#[derive(Debug, Serialize)]
pub struct ReviewerIdsBody {
    pub reviewer_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct MergeBody {
    pub squash: bool,
}
