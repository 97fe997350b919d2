//! Azure DevOps API response and request types.
//!
//! These types represent the raw JSON responses from the Azure DevOps Git
//! REST API. They are deserialized and then mapped to unified types.

use serde::{Deserialize, Serialize};

/// List envelope: Azure wraps every collection in `{count, value}`.
#[derive(Debug, Deserialize)]
pub struct AzureList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

// =============================================================================
// Identity
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureIdentity {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "uniqueName", default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

/// `connectionData` response; the only way to learn the caller's identity.
#[derive(Debug, Deserialize)]
pub struct AzureConnectionData {
    #[serde(rename = "authenticatedUser")]
    pub authenticated_user: AzureAuthenticatedUser,
}

#[derive(Debug, Deserialize)]
pub struct AzureAuthenticatedUser {
    pub id: String,
    #[serde(rename = "providerDisplayName", default)]
    pub provider_display_name: Option<String>,
}

// =============================================================================
// Pull request
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureCommitRef {
    #[serde(rename = "commitId")]
    pub commit_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureLabel {
    pub name: String,
}

/// Reviewer entry with a vote: 10 approved, 5 approved with suggestions,
/// 0 no vote, -5 waiting for author, -10 rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureReviewer {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "uniqueName", default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub vote: i32,
}

/// Azure DevOps pull request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzurePull {
    #[serde(rename = "pullRequestId")]
    pub pull_request_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// "active", "completed" or "abandoned".
    pub status: String,
    #[serde(rename = "isDraft", default)]
    pub is_draft: bool,
    #[serde(rename = "createdBy", default)]
    pub created_by: Option<AzureIdentity>,
    /// Full ref name, e.g. "refs/heads/feature".
    #[serde(rename = "sourceRefName")]
    pub source_ref_name: String,
    #[serde(rename = "targetRefName")]
    pub target_ref_name: String,
    #[serde(default)]
    pub labels: Vec<AzureLabel>,
    #[serde(default)]
    pub reviewers: Vec<AzureReviewer>,
    #[serde(rename = "lastMergeSourceCommit", default)]
    pub last_merge_source_commit: Option<AzureCommitRef>,
    #[serde(rename = "creationDate")]
    pub creation_date: String,
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Threads and comments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureFilePosition {
    pub line: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureThreadContext {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "rightFileStart", default)]
    pub right_file_start: Option<AzureFilePosition>,
    #[serde(rename = "leftFileStart", default)]
    pub left_file_start: Option<AzureFilePosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureComment {
    pub id: u64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<AzureIdentity>,
    /// "text" or "system".
    #[serde(rename = "commentType", default)]
    pub comment_type: Option<String>,
    #[serde(rename = "parentCommentId", default)]
    pub parent_comment_id: u64,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
    #[serde(rename = "lastUpdatedDate", default)]
    pub last_updated_date: Option<String>,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureThread {
    pub id: u64,
    /// "active", "fixed", "closed", "wontFix", "pending" or "byDesign".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comments: Vec<AzureComment>,
    #[serde(rename = "threadContext", default)]
    pub thread_context: Option<AzureThreadContext>,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
}

// =============================================================================
// Changes, commits, statuses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureItem {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureChangeEntry {
    pub item: AzureItem,
    /// "add", "edit", "delete" or "rename".
    #[serde(rename = "changeType")]
    pub change_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AzureIterationChanges {
    #[serde(rename = "changeEntries", default)]
    pub change_entries: Vec<AzureChangeEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AzureCommitChanges {
    #[serde(default)]
    pub changes: Vec<AzureChangeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureIteration {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureCommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureCommit {
    #[serde(rename = "commitId")]
    pub commit_id: String,
    /// Azure calls the commit message "comment".
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub author: Option<AzureCommitAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureStatusContext {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureStatus {
    #[serde(default)]
    pub context: Option<AzureStatusContext>,
    /// "succeeded", "failed", "error", "pending" or "notApplicable".
    pub state: String,
    #[serde(rename = "targetUrl", default)]
    pub target_url: Option<String>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateCommentBody<'a> {
    pub content: &'a str,
    #[serde(rename = "parentCommentId")]
    pub parent_comment_id: u64,
    #[serde(rename = "commentType")]
    pub comment_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateThreadBody<'a> {
    pub comments: Vec<CreateCommentBody<'a>>,
    pub status: &'static str,
    #[serde(rename = "threadContext", skip_serializing_if = "Option::is_none")]
    pub thread_context: Option<ThreadContextBody<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ThreadContextBody<'a> {
    #[serde(rename = "filePath")]
    pub file_path: &'a str,
    #[serde(rename = "rightFileStart", skip_serializing_if = "Option::is_none")]
    pub right_file_start: Option<AzureFilePosition>,
    #[serde(rename = "rightFileEnd", skip_serializing_if = "Option::is_none")]
    pub right_file_end: Option<AzureFilePosition>,
    #[serde(rename = "leftFileStart", skip_serializing_if = "Option::is_none")]
    pub left_file_start: Option<AzureFilePosition>,
    #[serde(rename = "leftFileEnd", skip_serializing_if = "Option::is_none")]
    pub left_file_end: Option<AzureFilePosition>,
}

#[derive(Debug, Serialize)]
pub struct VoteBody {
    pub vote: i32,
}
