//! Bitbucket Cloud API response and request types.
//!
//! These types represent the raw JSON responses from the Bitbucket 2.0 API.
//! They are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};

/// Body-driven pagination envelope: every list endpoint wraps its items in
/// `values` and advertises the next page as a full URL in `next`.
#[derive(Debug, Deserialize)]
pub struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketLink {
    pub href: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BitbucketUserLinks {
    #[serde(default)]
    pub avatar: Option<BitbucketLink>,
    #[serde(default)]
    pub html: Option<BitbucketLink>,
}

/// Bitbucket account. `nickname` is the closest thing to a login; accounts
/// created after Atlassian migration may only carry `display_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketUser {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub links: Option<BitbucketUserLinks>,
}

// =============================================================================
// Pull request
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketBranch {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketCommitRef {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketEndpoint {
    pub branch: BitbucketBranch,
    #[serde(default)]
    pub commit: Option<BitbucketCommitRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BitbucketPrLinks {
    #[serde(default)]
    pub html: Option<BitbucketLink>,
}

/// Reviewer entry on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketParticipant {
    #[serde(default)]
    pub user: Option<BitbucketUser>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub approved: bool,
    /// "approved", "changes_requested" or null.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub participated_on: Option<String>,
}

/// Bitbucket pull request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketPull {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// "OPEN", "MERGED", "DECLINED" or "SUPERSEDED".
    pub state: String,
    #[serde(default)]
    pub author: Option<BitbucketUser>,
    pub source: BitbucketEndpoint,
    pub destination: BitbucketEndpoint,
    #[serde(default)]
    pub participants: Vec<BitbucketParticipant>,
    #[serde(default)]
    pub links: BitbucketPrLinks,
    pub created_on: String,
    pub updated_on: String,
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketContent {
    #[serde(default)]
    pub raw: String,
}

/// Diff anchor on an inline comment. `to` addresses the new file side,
/// `from` the old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketInline {
    pub path: String,
    #[serde(default)]
    pub to: Option<u64>,
    #[serde(default)]
    pub from: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketParentRef {
    pub id: i64,
}

/// A PR comment; inline comments carry an `inline` anchor, conversation
/// comments do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketComment {
    pub id: i64,
    pub content: BitbucketContent,
    #[serde(default)]
    pub user: Option<BitbucketUser>,
    #[serde(default)]
    pub inline: Option<BitbucketInline>,
    #[serde(default)]
    pub parent: Option<BitbucketParentRef>,
    #[serde(default)]
    pub deleted: bool,
    pub created_on: String,
    #[serde(default)]
    pub updated_on: Option<String>,
}

// =============================================================================
// Diffstat, commits, statuses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketPathRef {
    pub path: String,
}

/// One entry of the diffstat listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketDiffStat {
    /// "added", "modified", "removed" or "renamed".
    pub status: String,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_removed: u64,
    #[serde(default)]
    pub old: Option<BitbucketPathRef>,
    #[serde(default)]
    pub new: Option<BitbucketPathRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketCommitAuthor {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub user: Option<BitbucketUser>,
}

/// One entry of the PR commits listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketCommit {
    pub hash: String,
    pub message: String,
    #[serde(default)]
    pub author: Option<BitbucketCommitAuthor>,
    #[serde(default)]
    pub date: Option<String>,
}

/// One commit/build status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketStatus {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// "SUCCESSFUL", "FAILED", "INPROGRESS" or "STOPPED".
    pub state: String,
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ContentBody<'a> {
    pub raw: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentRequest<'a> {
    pub content: ContentBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentBody>,
}

/// Exactly one of `to` and `from` is set, depending on the diff side.
#[derive(Debug, Serialize)]
pub struct InlineBody<'a> {
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ParentBody {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct MergeRequestBody<'a> {
    pub merge_strategy: &'a str,
}
