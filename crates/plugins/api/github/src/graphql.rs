//! GraphQL queries and response shapes.
//!
//! GitHub's REST API has no review-thread concept and no draft toggle, so
//! those operations go through GraphQL.

use serde::Deserialize;

pub const REVIEW_THREADS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      reviewThreads(first: 100) {
        nodes {
          id
          isResolved
          comments(first: 100) {
            nodes { databaseId }
          }
        }
      }
    }
  }
}"#;

pub const RESOLVE_THREAD_MUTATION: &str = r#"
mutation($threadId: ID!) {
  resolveReviewThread(input: {threadId: $threadId}) {
    thread { id isResolved }
  }
}"#;

pub const UNRESOLVE_THREAD_MUTATION: &str = r#"
mutation($threadId: ID!) {
  unresolveReviewThread(input: {threadId: $threadId}) {
    thread { id isResolved }
  }
}"#;

pub const CONVERT_TO_DRAFT_MUTATION: &str = r#"
mutation($pullRequestId: ID!) {
  convertPullRequestToDraft(input: {pullRequestId: $pullRequestId}) {
    pullRequest { id isDraft }
  }
}"#;

pub const MARK_READY_MUTATION: &str = r#"
mutation($pullRequestId: ID!) {
  markPullRequestReadyForReview(input: {pullRequestId: $pullRequestId}) {
    pullRequest { id isDraft }
  }
}"#;

pub const ADD_PENDING_COMMENT_MUTATION: &str = r#"
mutation($reviewId: ID!, $path: String!, $line: Int!, $side: DiffSide!, $body: String!) {
  addPullRequestReviewThread(
    input: {pullRequestReviewId: $reviewId, path: $path, line: $line, side: $side, body: $body}
  ) {
    thread { id }
  }
}"#;

pub const SUBMIT_PENDING_REVIEW_MUTATION: &str = r#"
mutation($reviewId: ID!, $event: PullRequestReviewEvent!, $body: String) {
  submitPullRequestReview(input: {pullRequestReviewId: $reviewId, event: $event, body: $body}) {
    pullRequestReview { id }
  }
}"#;

pub const DISCARD_PENDING_REVIEW_MUTATION: &str = r#"
mutation($reviewId: ID!) {
  deletePullRequestReview(input: {pullRequestReviewId: $reviewId}) {
    pullRequestReview { id }
  }
}"#;

// Response shapes for the review-threads query. Mutations are decoded as
// `serde_json::Value` since only success matters.

#[derive(Debug, Deserialize)]
pub struct ThreadsData {
    pub repository: Option<ThreadsRepository>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadsRepository {
    #[serde(rename = "pullRequest")]
    pub pull_request: Option<ThreadsPullRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadsPullRequest {
    #[serde(rename = "reviewThreads")]
    pub review_threads: ThreadNodes,
}

#[derive(Debug, Deserialize)]
pub struct ThreadNodes {
    pub nodes: Vec<ThreadNode>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadNode {
    pub id: String,
    #[serde(rename = "isResolved")]
    pub is_resolved: bool,
    pub comments: ThreadCommentNodes,
}

#[derive(Debug, Deserialize)]
pub struct ThreadCommentNodes {
    pub nodes: Vec<ThreadCommentNode>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadCommentNode {
    #[serde(rename = "databaseId")]
    pub database_id: Option<i64>,
}
