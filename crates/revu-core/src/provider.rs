//! Provider contract for git hosting services.
//!
//! One trait, one implementation per platform. Callers hold a
//! `Box<dyn Provider>` and branch on [`ProviderCapabilities`] before
//! invoking capability-gated operations; an adapter invoked outside its
//! capability still behaves deterministically (documented no-op success or
//! typed failure).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    CheckRun, Comment, Commit, DiffCommentInput, FileChange, IssueComment, MergeStrategy,
    PendingReview, PrStateFilter, PullRequest, Review, ReviewEvent, ReviewThread, User,
};

/// What a backend can do. Computed once at adapter construction from the
/// provider type; never mutated. Flags are advisory, not enforced.
#[derive(Debug, Clone)]
pub struct ProviderCapabilities {
    pub draft_prs: bool,
    pub review_threads: bool,
    pub graphql: bool,
    pub reactions: bool,
    pub check_runs: bool,
    pub labels: bool,
    /// Never empty; listed in the platform's preference order.
    pub merge_strategies: Vec<MergeStrategy>,
}

/// Trait for git hosting providers (GitHub, GitLab, Bitbucket, Azure
/// DevOps, Gitea).
///
/// Every method returns a success value or an `ApiError`; none may panic
/// for an expected failure mode. All calls are single-shot async I/O with
/// no shared mutable state, so callers may run them concurrently.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "github", "gitlab").
    fn name(&self) -> &str;

    /// Feature flags for this backend.
    fn capabilities(&self) -> &ProviderCapabilities;

    // --- PR reads ---

    /// List pull requests in the configured repository.
    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>>;

    /// Fetch a single pull request.
    async fn get_pr(&self, number: u64) -> Result<PullRequest>;

    /// Changed files of a pull request.
    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>>;

    /// Diff-anchored review comments.
    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>>;

    /// Conversation-level comments.
    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>>;

    /// Submitted reviews.
    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>>;

    /// Commits on the pull request branch.
    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>>;

    /// CI checks for the head commit.
    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>>;

    /// Resolvable review threads. Gated by `capabilities().review_threads`.
    async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>>;

    /// Files changed by a single commit.
    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>>;

    // --- User-scoped queries ---

    /// Open pull requests authored by the authenticated user.
    async fn get_my_prs(&self) -> Result<Vec<PullRequest>>;

    /// Open pull requests where the authenticated user's review is requested.
    async fn get_review_requests(&self) -> Result<Vec<PullRequest>>;

    /// Open pull requests involving the authenticated user.
    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>>;

    // --- Review mutations ---

    /// Submit a review verdict, optionally with a body.
    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()>;

    /// Start a staged review that batches comments before submission.
    async fn create_pending_review(&self, number: u64) -> Result<PendingReview>;

    /// Attach a diff comment to a pending review.
    async fn add_pending_review_comment(
        &self,
        number: u64,
        review_id: &str,
        input: DiffCommentInput,
    ) -> Result<()>;

    /// Submit a pending review with a verdict.
    async fn submit_pending_review(
        &self,
        number: u64,
        review_id: &str,
        body: &str,
        event: ReviewEvent,
    ) -> Result<()>;

    /// Discard a pending review and its staged comments.
    async fn discard_pending_review(&self, number: u64, review_id: &str) -> Result<()>;

    // --- Comment mutations ---

    /// Post a conversation-level comment.
    async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment>;

    /// Post a new diff-anchored comment.
    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment>;

    /// Reply to an existing diff comment.
    async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment>;

    /// Edit a diff comment's body. The PR number is required by platforms
    /// whose comment ids are only unique within a merge request.
    async fn update_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment>;

    /// Delete a diff comment.
    async fn delete_comment(&self, number: u64, comment_id: i64) -> Result<()>;

    // --- PR-state mutations ---

    /// Merge the pull request with the given strategy.
    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()>;

    async fn close_pr(&self, number: u64) -> Result<()>;

    async fn reopen_pr(&self, number: u64) -> Result<()>;

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()>;

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()>;

    /// Re-request review from the given reviewers.
    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()>;

    // --- Thread operations ---

    /// Mark a review thread resolved. Gated by `review_threads`.
    async fn resolve_thread(&self, thread_id: &str) -> Result<()>;

    /// Mark a review thread unresolved. Gated by `review_threads`.
    async fn unresolve_thread(&self, thread_id: &str) -> Result<()>;

    // --- Draft operations ---

    /// Convert an open pull request to a draft. The handle is
    /// platform-specific (GitHub: PR node id; GitLab/Gitea: `"{iid}:{title}"`).
    async fn convert_to_draft(&self, handle: &str) -> Result<()>;

    /// Mark a draft pull request ready for review.
    async fn mark_ready_for_review(&self, handle: &str) -> Result<()>;

    // --- Label operations ---

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    async fn remove_label(&self, number: u64, label: &str) -> Result<()>;

    // --- Identity ---

    /// The authenticated user.
    async fn get_current_user(&self) -> Result<User>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, HttpFailure, ProviderKind};
    use mockall::mock;

    mock! {
        TestProvider {}

        #[async_trait]
        impl Provider for TestProvider {
            fn name(&self) -> &str;
            fn capabilities(&self) -> &ProviderCapabilities;
            async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>>;
            async fn get_pr(&self, number: u64) -> Result<PullRequest>;
            async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>>;
            async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>>;
            async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>>;
            async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>>;
            async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>>;
            async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>>;
            async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>>;
            async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>>;
            async fn get_my_prs(&self) -> Result<Vec<PullRequest>>;
            async fn get_review_requests(&self) -> Result<Vec<PullRequest>>;
            async fn get_involved_prs(&self) -> Result<Vec<PullRequest>>;
            async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()>;
            async fn create_pending_review(&self, number: u64) -> Result<PendingReview>;
            async fn add_pending_review_comment(
                &self,
                number: u64,
                review_id: &str,
                input: DiffCommentInput,
            ) -> Result<()>;
            async fn submit_pending_review(
                &self,
                number: u64,
                review_id: &str,
                body: &str,
                event: ReviewEvent,
            ) -> Result<()>;
            async fn discard_pending_review(&self, number: u64, review_id: &str) -> Result<()>;
            async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment>;
            async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment>;
            async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment>;
            async fn update_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment>;
            async fn delete_comment(&self, number: u64, comment_id: i64) -> Result<()>;
            async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()>;
            async fn close_pr(&self, number: u64) -> Result<()>;
            async fn reopen_pr(&self, number: u64) -> Result<()>;
            async fn update_pr_title(&self, number: u64, title: &str) -> Result<()>;
            async fn update_pr_body(&self, number: u64, body: &str) -> Result<()>;
            async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()>;
            async fn resolve_thread(&self, thread_id: &str) -> Result<()>;
            async fn unresolve_thread(&self, thread_id: &str) -> Result<()>;
            async fn convert_to_draft(&self, handle: &str) -> Result<()>;
            async fn mark_ready_for_review(&self, handle: &str) -> Result<()>;
            async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;
            async fn remove_label(&self, number: u64, label: &str) -> Result<()>;
            async fn get_current_user(&self) -> Result<User>;
        }
    }

    #[tokio::test]
    async fn trait_objects_dispatch() {
        let mut mock = MockTestProvider::new();
        mock.expect_name().return_const("github".to_string());
        mock.expect_get_pr().returning(|number| {
            Ok(PullRequest {
                number,
                title: "Add provider layer".to_string(),
                body: None,
                state: crate::types::PrState::Open,
                draft: false,
                merged: false,
                author: None,
                head_ref: "feature".to_string(),
                base_ref: "main".to_string(),
                labels: vec![],
                additions: None,
                deletions: None,
                changed_files: None,
                url: "https://example.test/pr/7".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                updated_at: "2024-01-01T00:00:00Z".to_string(),
            })
        });

        let provider: Box<dyn Provider> = Box::new(mock);
        assert_eq!(provider.name(), "github");
        let pr = provider.get_pr(7).await.unwrap();
        assert_eq!(pr.number, 7);
    }

    #[tokio::test]
    async fn errors_propagate_as_values() {
        let mut mock = MockTestProvider::new();
        mock.expect_resolve_thread().returning(|_| {
            Err(ProviderKind::Bitbucket.error(HttpFailure::message(
                "thread resolution is not supported on this platform",
            )))
        });

        let provider: Box<dyn Provider> = Box::new(mock);
        let err = provider.resolve_thread("t-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Bitbucket(_)));
    }
}
