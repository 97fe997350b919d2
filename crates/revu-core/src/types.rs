//! Unified data model shared across providers.
//!
//! These shapes are decoded from provider payloads at the adapter boundary
//! and are immutable once returned. A payload that cannot be decoded is a
//! typed error, never a partially-populated value.

use serde::{Deserialize, Serialize};

/// Represents a user from a git hosting service.
///
/// GitLab's `username` and Azure's `uniqueName` both map to `login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// State filter accepted by listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrStateFilter {
    #[default]
    Open,
    Closed,
    All,
}

/// A pull request (GitHub/Bitbucket/Azure/Gitea) or merge request (GitLab).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: PrState,
    pub draft: bool,
    pub merged: bool,
    pub author: Option<User>,
    pub head_ref: String,
    pub base_ref: String,
    pub labels: Vec<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A submitted review on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub author: Option<User>,
    /// Provider-normalized verdict: APPROVED, CHANGES_REQUESTED, COMMENTED, ...
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: Option<String>,
}

/// Which side of a diff a comment is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffSide {
    Left,
    Right,
}

/// A review (diff) comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub author: Option<User>,
    pub path: Option<String>,
    pub line: Option<u64>,
    pub side: Option<DiffSide>,
    pub in_reply_to: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// A conversation-level comment on the pull request itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: i64,
    pub body: String,
    pub author: Option<User>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// One changed file in a pull request or commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub previous_path: Option<String>,
    /// added / removed / modified / renamed
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub patch: Option<String>,
}

/// A commit on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author_login: Option<String>,
    pub authored_at: Option<String>,
}

/// A CI check attached to the head commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub url: Option<String>,
}

/// Comment membership of a review thread, by database id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadComment {
    pub database_id: i64,
}

/// A resolvable review discussion.
///
/// The `id` is opaque to callers; its internal structure is
/// platform-specific (GitHub uses GraphQL node ids, GitLab encodes
/// `iid:discussion_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewThread {
    pub id: String,
    pub is_resolved: bool,
    pub comments: Vec<ThreadComment>,
}

/// Verdict attached to a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

/// Merge strategies a platform may offer, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Merge,
    Squash,
    Rebase,
}

/// Handle for a staged, not-yet-submitted review.
///
/// GitHub carries the review's GraphQL node id; platforms without the
/// primitive return the documented dummy `"0"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    pub id: String,
}

/// Input for creating a new diff-anchored comment.
#[derive(Debug, Clone)]
pub struct DiffCommentInput {
    pub body: String,
    /// Head commit the position refers to; adapters that need it and do not
    /// receive it fetch the PR first.
    pub commit_sha: Option<String>,
    pub path: String,
    pub line: u64,
    pub side: DiffSide,
}

impl std::fmt::Display for PrStateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}
