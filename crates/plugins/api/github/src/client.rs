//! GitHub API client implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use revu_core::error::{HttpFailure, ProviderKind, Result};
use revu_core::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, Provider, ProviderCapabilities,
    ProviderConfig, PullRequest, Review, ReviewEvent, ReviewThread, ThreadComment, User,
};
use revu_transport::{github_graphql_url, github_rest_url, CancellationToken, Transport};

use crate::graphql;
use crate::types::{
    AddLabelsBody, CreateIssueCommentRequest, CreateReviewCommentRequest, GitHubCheckRun,
    GitHubCheckRuns, GitHubCommitDetail, GitHubCommitEntry, GitHubFile, GitHubIssueComment,
    GitHubPull, GitHubReview, GitHubReviewComment, GitHubSearchItem, GitHubUser,
    MergeRequestBody, RequestReviewersBody, SubmitReviewRequest,
};

/// GitHub provider.
pub struct GitHubProvider {
    owner: String,
    repo: String,
    transport: Transport,
    capabilities: ProviderCapabilities,
}

impl GitHubProvider {
    /// Create a provider from a repository context.
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a provider whose in-flight calls stop when `cancel` fires.
    pub fn with_cancellation(config: &ProviderConfig, cancel: CancellationToken) -> Self {
        let base = config.base_url.as_deref();
        let transport = Transport::new(
            ProviderKind::GitHub,
            github_rest_url(base),
            config.token.clone(),
        )
        .with_accept("application/vnd.github+json")
        .with_api_version("X-GitHub-Api-Version", "2022-11-28")
        .with_graphql_url(github_graphql_url(base))
        .with_cancellation(cancel);

        Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            transport,
            capabilities: ProviderCapabilities {
                draft_prs: true,
                review_threads: true,
                graphql: true,
                reactions: true,
                check_runs: true,
                labels: true,
                merge_strategies: vec![
                    MergeStrategy::Merge,
                    MergeStrategy::Squash,
                    MergeStrategy::Rebase,
                ],
            },
        }
    }

    /// Shared transport, exposed for rate-limit and token-expiry consumers.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn repo_path(&self, endpoint: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, endpoint)
    }

    async fn search_prs(&self, query: &str) -> Result<Vec<PullRequest>> {
        let path = format!("/search/issues?q={}", urlencoding::encode(query));
        let items: Vec<GitHubSearchItem> = self.transport.fetch_search_paginated(&path).await?;
        Ok(items.iter().map(map_search_item).collect())
    }

    async fn head_sha(&self, number: u64) -> Result<String> {
        let pull: GitHubPull = self
            .transport
            .get_json(&self.repo_path(&format!("/pulls/{}", number)))
            .await?;
        Ok(pull.head.sha)
    }
}

// =============================================================================
// Mapping functions: GitHub types -> Unified types
// =============================================================================

fn map_user(gh_user: Option<&GitHubUser>) -> Option<User> {
    gh_user.map(|u| User {
        login: u.login.clone(),
        id: Some(u.id),
        name: u.name.clone(),
        avatar_url: u.avatar_url.clone(),
    })
}

fn map_state(state: &str, merged: bool) -> PrState {
    if merged {
        PrState::Merged
    } else if state == "closed" {
        PrState::Closed
    } else {
        PrState::Open
    }
}

fn map_pull(gh_pull: &GitHubPull) -> PullRequest {
    let merged = gh_pull.merged_at.is_some();
    PullRequest {
        number: gh_pull.number,
        title: gh_pull.title.clone(),
        body: gh_pull.body.clone(),
        state: map_state(&gh_pull.state, merged),
        draft: gh_pull.draft,
        merged,
        author: map_user(gh_pull.user.as_ref()),
        head_ref: gh_pull.head.ref_name.clone(),
        base_ref: gh_pull.base.ref_name.clone(),
        labels: gh_pull.labels.iter().map(|l| l.name.clone()).collect(),
        additions: gh_pull.additions,
        deletions: gh_pull.deletions,
        changed_files: gh_pull.changed_files,
        url: gh_pull.html_url.clone(),
        created_at: gh_pull.created_at.clone(),
        updated_at: gh_pull.updated_at.clone(),
    }
}

/// Search results are issue-shaped and omit branch refs; those fields map to
/// empty strings and callers needing them fetch the full PR.
fn map_search_item(item: &GitHubSearchItem) -> PullRequest {
    PullRequest {
        number: item.number,
        title: item.title.clone(),
        body: item.body.clone(),
        state: map_state(&item.state, false),
        draft: item.draft,
        merged: false,
        author: map_user(item.user.as_ref()),
        head_ref: String::new(),
        base_ref: String::new(),
        labels: item.labels.iter().map(|l| l.name.clone()).collect(),
        additions: None,
        deletions: None,
        changed_files: None,
        url: item.html_url.clone(),
        created_at: item.created_at.clone(),
        updated_at: item.updated_at.clone(),
    }
}

fn map_review(gh_review: &GitHubReview) -> Review {
    Review {
        id: gh_review.id,
        author: map_user(gh_review.user.as_ref()),
        state: gh_review.state.clone(),
        body: gh_review.body.clone().filter(|b| !b.is_empty()),
        submitted_at: gh_review.submitted_at.clone(),
    }
}

fn map_side(side: Option<&str>) -> Option<DiffSide> {
    match side {
        Some("LEFT") => Some(DiffSide::Left),
        Some("RIGHT") => Some(DiffSide::Right),
        _ => None,
    }
}

fn map_review_comment(gh_comment: &GitHubReviewComment) -> Comment {
    Comment {
        id: gh_comment.id,
        body: gh_comment.body.clone(),
        author: map_user(gh_comment.user.as_ref()),
        path: gh_comment.path.clone(),
        line: gh_comment.line,
        side: map_side(gh_comment.side.as_deref()),
        in_reply_to: gh_comment.in_reply_to_id,
        created_at: gh_comment.created_at.clone(),
        updated_at: gh_comment.updated_at.clone(),
    }
}

fn map_issue_comment(gh_comment: &GitHubIssueComment) -> IssueComment {
    IssueComment {
        id: gh_comment.id,
        body: gh_comment.body.clone(),
        author: map_user(gh_comment.user.as_ref()),
        created_at: gh_comment.created_at.clone(),
        updated_at: gh_comment.updated_at.clone(),
    }
}

fn map_file(gh_file: &GitHubFile) -> FileChange {
    FileChange {
        path: gh_file.filename.clone(),
        previous_path: gh_file.previous_filename.clone(),
        status: gh_file.status.clone(),
        additions: gh_file.additions,
        deletions: gh_file.deletions,
        patch: gh_file.patch.clone(),
    }
}

fn map_commit(entry: &GitHubCommitEntry) -> Commit {
    Commit {
        sha: entry.sha.clone(),
        message: entry.commit.message.clone(),
        author_login: entry.author.as_ref().map(|u| u.login.clone()),
        authored_at: entry
            .commit
            .author
            .as_ref()
            .and_then(|a| a.date.clone()),
    }
}

fn map_check(run: &GitHubCheckRun) -> CheckRun {
    CheckRun {
        name: run.name.clone(),
        status: run.status.clone(),
        conclusion: run.conclusion.clone(),
        url: run.html_url.clone(),
    }
}

fn event_str(event: ReviewEvent) -> &'static str {
    match event {
        ReviewEvent::Approve => "APPROVE",
        ReviewEvent::RequestChanges => "REQUEST_CHANGES",
        ReviewEvent::Comment => "COMMENT",
    }
}

fn side_str(side: DiffSide) -> &'static str {
    match side {
        DiffSide::Left => "LEFT",
        DiffSide::Right => "RIGHT",
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl Provider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>> {
        let path = self.repo_path(&format!("/pulls?state={}", state));
        let pulls: Vec<GitHubPull> = self.transport.fetch_paginated(&path).await?;
        Ok(pulls.iter().map(map_pull).collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        let pull: GitHubPull = self
            .transport
            .get_json(&self.repo_path(&format!("/pulls/{}", number)))
            .await?;
        Ok(map_pull(&pull))
    }

    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let path = self.repo_path(&format!("/pulls/{}/files", number));
        let files: Vec<GitHubFile> = self.transport.fetch_paginated(&path).await?;
        Ok(files.iter().map(map_file).collect())
    }

    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let path = self.repo_path(&format!("/pulls/{}/comments", number));
        let comments: Vec<GitHubReviewComment> = self.transport.fetch_paginated(&path).await?;
        Ok(comments.iter().map(map_review_comment).collect())
    }

    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>> {
        let path = self.repo_path(&format!("/issues/{}/comments", number));
        let comments: Vec<GitHubIssueComment> = self.transport.fetch_paginated(&path).await?;
        Ok(comments.iter().map(map_issue_comment).collect())
    }

    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>> {
        let path = self.repo_path(&format!("/pulls/{}/reviews", number));
        let reviews: Vec<GitHubReview> = self.transport.fetch_paginated(&path).await?;
        Ok(reviews.iter().map(map_review).collect())
    }

    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>> {
        let path = self.repo_path(&format!("/pulls/{}/commits", number));
        let commits: Vec<GitHubCommitEntry> = self.transport.fetch_paginated(&path).await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>> {
        let sha = self.head_sha(number).await?;
        let path = self.repo_path(&format!("/commits/{}/check-runs?per_page=100", sha));
        let runs: GitHubCheckRuns = self.transport.get_json(&path).await?;
        Ok(runs.check_runs.iter().map(map_check).collect())
    }

    async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>> {
        let data: graphql::ThreadsData = self
            .transport
            .graphql(
                graphql::REVIEW_THREADS_QUERY,
                json!({
                    "owner": self.owner,
                    "name": self.repo,
                    "number": number,
                }),
            )
            .await?;

        let nodes = data
            .repository
            .and_then(|r| r.pull_request)
            .map(|pr| pr.review_threads.nodes)
            .unwrap_or_default();

        Ok(nodes
            .into_iter()
            .map(|node| ReviewThread {
                id: node.id,
                is_resolved: node.is_resolved,
                comments: node
                    .comments
                    .nodes
                    .into_iter()
                    .filter_map(|c| c.database_id)
                    .map(|database_id| ThreadComment { database_id })
                    .collect(),
            })
            .collect())
    }

    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>> {
        let detail: GitHubCommitDetail = self
            .transport
            .get_json(&self.repo_path(&format!("/commits/{}", sha)))
            .await?;
        Ok(detail.files.iter().map(map_file).collect())
    }

    async fn get_my_prs(&self) -> Result<Vec<PullRequest>> {
        self.search_prs("is:pr is:open author:@me").await
    }

    async fn get_review_requests(&self) -> Result<Vec<PullRequest>> {
        self.search_prs("is:pr is:open review-requested:@me").await
    }

    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>> {
        self.search_prs("is:pr is:open involves:@me").await
    }

    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}/reviews", number));
        let request = SubmitReviewRequest {
            body: (!body.is_empty()).then_some(body),
            event: event_str(event),
        };
        self.transport
            .mutate_empty(Method::POST, &path, Some(&request))
            .await
    }

    async fn create_pending_review(&self, number: u64) -> Result<PendingReview> {
        // A review created with no event stays in state PENDING; the node id
        // addresses it in the GraphQL lifecycle mutations.
        let path = self.repo_path(&format!("/pulls/{}/reviews", number));
        let review: GitHubReview = self
            .transport
            .mutate_json(Method::POST, &path, &json!({}))
            .await?;
        Ok(PendingReview {
            id: review.node_id,
        })
    }

    async fn add_pending_review_comment(
        &self,
        _number: u64,
        review_id: &str,
        input: DiffCommentInput,
    ) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::ADD_PENDING_COMMENT_MUTATION,
                json!({
                    "reviewId": review_id,
                    "path": input.path,
                    "line": input.line,
                    "side": side_str(input.side),
                    "body": input.body,
                }),
            )
            .await?;
        Ok(())
    }

    async fn submit_pending_review(
        &self,
        _number: u64,
        review_id: &str,
        body: &str,
        event: ReviewEvent,
    ) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::SUBMIT_PENDING_REVIEW_MUTATION,
                json!({
                    "reviewId": review_id,
                    "event": event_str(event),
                    "body": body,
                }),
            )
            .await?;
        Ok(())
    }

    async fn discard_pending_review(&self, _number: u64, review_id: &str) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::DISCARD_PENDING_REVIEW_MUTATION,
                json!({ "reviewId": review_id }),
            )
            .await?;
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment> {
        let path = self.repo_path(&format!("/issues/{}/comments", number));
        let comment: GitHubIssueComment = self
            .transport
            .mutate_json(Method::POST, &path, &CreateIssueCommentRequest { body })
            .await?;
        Ok(map_issue_comment(&comment))
    }

    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment> {
        let commit_id = match &input.commit_sha {
            Some(sha) => sha.clone(),
            None => self.head_sha(number).await?,
        };
        let path = self.repo_path(&format!("/pulls/{}/comments", number));
        let request = CreateReviewCommentRequest {
            body: &input.body,
            commit_id: &commit_id,
            path: &input.path,
            line: input.line,
            side: side_str(input.side),
        };
        let comment: GitHubReviewComment = self
            .transport
            .mutate_json(Method::POST, &path, &request)
            .await?;
        Ok(map_review_comment(&comment))
    }

    async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let path = self.repo_path(&format!("/pulls/{}/comments/{}/replies", number, comment_id));
        let comment: GitHubReviewComment = self
            .transport
            .mutate_json(Method::POST, &path, &CreateIssueCommentRequest { body })
            .await?;
        Ok(map_review_comment(&comment))
    }

    async fn update_comment(&self, _number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let path = self.repo_path(&format!("/pulls/comments/{}", comment_id));
        let comment: GitHubReviewComment = self
            .transport
            .mutate_json(Method::PATCH, &path, &CreateIssueCommentRequest { body })
            .await?;
        Ok(map_review_comment(&comment))
    }

    async fn delete_comment(&self, _number: u64, comment_id: i64) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/comments/{}", comment_id));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}/merge", number));
        let request = MergeRequestBody {
            merge_method: strategy.as_str(),
        };
        self.transport
            .mutate_empty(Method::PUT, &path, Some(&request))
            .await
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}", number));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"state": "closed"})))
            .await
    }

    async fn reopen_pr(&self, number: u64) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}", number));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"state": "open"})))
            .await
    }

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}", number));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"title": title})))
            .await
    }

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}", number));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"body": body})))
            .await
    }

    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Err(ProviderKind::GitHub
                .error(HttpFailure::message("no reviewers given to re-request")));
        }
        let path = self.repo_path(&format!("/pulls/{}/requested_reviewers", number));
        self.transport
            .mutate_empty(Method::POST, &path, Some(&RequestReviewersBody { reviewers }))
            .await
    }

    async fn resolve_thread(&self, thread_id: &str) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::RESOLVE_THREAD_MUTATION,
                json!({ "threadId": thread_id }),
            )
            .await?;
        Ok(())
    }

    async fn unresolve_thread(&self, thread_id: &str) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::UNRESOLVE_THREAD_MUTATION,
                json!({ "threadId": thread_id }),
            )
            .await?;
        Ok(())
    }

    async fn convert_to_draft(&self, handle: &str) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::CONVERT_TO_DRAFT_MUTATION,
                json!({ "pullRequestId": handle }),
            )
            .await?;
        Ok(())
    }

    async fn mark_ready_for_review(&self, handle: &str) -> Result<()> {
        self.transport
            .graphql::<serde_json::Value>(
                graphql::MARK_READY_MUTATION,
                json!({ "pullRequestId": handle }),
            )
            .await?;
        Ok(())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let path = self.repo_path(&format!("/issues/{}/labels", number));
        self.transport
            .mutate_empty(Method::POST, &path, Some(&AddLabelsBody { labels }))
            .await
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        let path = self.repo_path(&format!(
            "/issues/{}/labels/{}",
            number,
            urlencoding::encode(label)
        ));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn get_current_user(&self) -> Result<User> {
        let user: GitHubUser = self.transport.get_json("/user").await?;
        Ok(User {
            login: user.login,
            id: Some(user.id),
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }
}
