//! Gitea API client implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use revu_core::error::{HttpFailure, ProviderKind, Result};
use revu_core::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, Provider, ProviderCapabilities,
    ProviderConfig, PullRequest, Review, ReviewEvent, ReviewThread, User,
};
use revu_transport::{AuthScheme, CancellationToken, Transport};

use crate::types::{
    AddLabelsBody, CreateIssueCommentRequest, CreateReviewRequest, GiteaCommitEntry,
    GiteaCommitWithFiles, GiteaFile, GiteaIssueComment, GiteaLabel, GiteaPull, GiteaReview,
    GiteaReviewComment, GiteaStatus, GiteaUser, MergeRequestBody, RequestReviewersBody,
    ReviewCommentInput,
};
use crate::DEFAULT_GITEA_URL;

/// Title prefix marking a work-in-progress pull request.
const WIP_PREFIX: &str = "WIP: ";

/// Gitea provider.
pub struct GiteaProvider {
    owner: String,
    repo: String,
    transport: Transport,
    capabilities: ProviderCapabilities,
}

impl GiteaProvider {
    /// Create a provider from a repository context.
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a provider whose in-flight calls stop when `cancel` fires.
    pub fn with_cancellation(config: &ProviderConfig, cancel: CancellationToken) -> Self {
        let root = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GITEA_URL.to_string());
        let base = format!("{}/api/v1", root.trim_end_matches('/'));

        let transport = Transport::new(ProviderKind::Gitea, base, config.token.clone())
            .with_auth_scheme(AuthScheme::Token)
            .with_cancellation(cancel);

        Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            transport,
            capabilities: ProviderCapabilities {
                draft_prs: true,
                review_threads: false,
                graphql: false,
                reactions: false,
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

    fn unsupported(&self, what: &str) -> revu_core::ApiError {
        ProviderKind::Gitea.error(HttpFailure::message(format!(
            "{} are not supported on Gitea",
            what
        )))
    }

    async fn get_raw_pr(&self, number: u64) -> Result<GiteaPull> {
        self.transport
            .get_json(&self.repo_path(&format!("/pulls/{}", number)))
            .await
    }

    /// Gitea has no user-scoped PR search, so caller-centric listings filter
    /// the open PRs client-side against the authenticated login.
    async fn open_prs_and_login(&self) -> Result<(Vec<GiteaPull>, String)> {
        let me: GiteaUser = self.transport.get_json("/user").await?;
        let pulls: Vec<GiteaPull> = self
            .transport
            .fetch_paginated(&self.repo_path("/pulls?state=open"))
            .await?;
        Ok((pulls, me.login))
    }

    async fn resolve_label_ids(&self, labels: &[String]) -> Result<Vec<i64>> {
        let known: Vec<GiteaLabel> = self
            .transport
            .fetch_paginated(&self.repo_path("/labels"))
            .await?;
        labels
            .iter()
            .map(|name| {
                known
                    .iter()
                    .find(|l| l.name == *name)
                    .map(|l| l.id)
                    .ok_or_else(|| {
                        ProviderKind::Gitea.error(HttpFailure::message(format!(
                            "label '{}' does not exist in this repository",
                            name
                        )))
                    })
            })
            .collect()
    }

    async fn patch_pr(&self, number: u64, body: &serde_json::Value) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PATCH,
                &self.repo_path(&format!("/pulls/{}", number)),
                Some(body),
            )
            .await
    }
}

// =============================================================================
// Mapping functions: Gitea types -> Unified types
// =============================================================================

fn map_user(user: Option<&GiteaUser>) -> Option<User> {
    user.map(|u| User {
        login: u.login.clone(),
        id: Some(u.id),
        name: u.full_name.clone().filter(|n| !n.is_empty()),
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

fn map_pull(pull: &GiteaPull) -> PullRequest {
    PullRequest {
        number: pull.number,
        title: pull.title.clone(),
        body: pull.body.clone(),
        state: map_state(&pull.state, pull.merged),
        draft: pull.title.starts_with(WIP_PREFIX) || pull.title.starts_with("WIP:"),
        merged: pull.merged,
        author: map_user(pull.user.as_ref()),
        head_ref: pull.head.ref_name.clone(),
        base_ref: pull.base.ref_name.clone(),
        labels: pull.labels.iter().map(|l| l.name.clone()).collect(),
        additions: None,
        deletions: None,
        changed_files: None,
        url: pull.html_url.clone(),
        created_at: pull.created_at.clone(),
        updated_at: pull.updated_at.clone(),
    }
}

fn map_review_state(state: &str) -> Option<String> {
    match state {
        "APPROVED" => Some("APPROVED".to_string()),
        "REQUEST_CHANGES" => Some("CHANGES_REQUESTED".to_string()),
        "COMMENT" => Some("COMMENTED".to_string()),
        // Pending reviews are private to their author; hide them.
        _ => None,
    }
}

fn map_review_comment(comment: &GiteaReviewComment) -> Comment {
    let (line, side) = match (comment.position, comment.original_position) {
        (Some(p), _) if p > 0 => (Some(p), Some(DiffSide::Right)),
        (_, Some(p)) if p > 0 => (Some(p), Some(DiffSide::Left)),
        _ => (None, None),
    };
    Comment {
        id: comment.id,
        body: comment.body.clone(),
        author: map_user(comment.user.as_ref()),
        path: comment.path.clone(),
        line,
        side,
        in_reply_to: None,
        created_at: comment.created_at.clone(),
        updated_at: comment.updated_at.clone(),
    }
}

fn map_issue_comment(comment: &GiteaIssueComment) -> IssueComment {
    IssueComment {
        id: comment.id,
        body: comment.body.clone(),
        author: map_user(comment.user.as_ref()),
        created_at: comment.created_at.clone(),
        updated_at: comment.updated_at.clone(),
    }
}

fn map_file(file: &GiteaFile) -> FileChange {
    let status = match file.status.as_str() {
        "added" => "added",
        "deleted" => "removed",
        "renamed" => "renamed",
        _ => "modified",
    };
    FileChange {
        path: file.filename.clone(),
        previous_path: file.previous_filename.clone(),
        status: status.to_string(),
        additions: file.additions,
        deletions: file.deletions,
        patch: None,
    }
}

fn map_commit(entry: &GiteaCommitEntry) -> Commit {
    Commit {
        sha: entry.sha.clone(),
        message: entry.commit.message.clone(),
        author_login: entry.author.as_ref().map(|u| u.login.clone()),
        authored_at: entry.commit.author.as_ref().and_then(|a| a.date.clone()),
    }
}

fn map_status(status: &GiteaStatus) -> CheckRun {
    let terminal = matches!(status.status.as_str(), "success" | "failure" | "error");
    CheckRun {
        name: status.context.clone().unwrap_or_default(),
        status: if terminal {
            "completed".to_string()
        } else {
            "in_progress".to_string()
        },
        conclusion: terminal.then(|| status.status.clone()),
        url: status.target_url.clone(),
    }
}

fn event_str(event: ReviewEvent) -> &'static str {
    match event {
        ReviewEvent::Approve => "APPROVED",
        ReviewEvent::RequestChanges => "REQUEST_CHANGES",
        ReviewEvent::Comment => "COMMENT",
    }
}

/// Draft handles are `"{number}:{title}"`; the title travels with the handle
/// because toggling the WIP prefix rewrites it.
fn parse_draft_handle(handle: &str) -> Result<(u64, &str)> {
    let (number, title) = handle.split_once(':').ok_or_else(|| {
        ProviderKind::Gitea.error(HttpFailure::message(format!(
            "malformed draft handle '{}': expected '{{number}}:{{title}}'",
            handle
        )))
    })?;
    let number = number.parse().map_err(|_| {
        ProviderKind::Gitea.error(HttpFailure::message(format!(
            "malformed draft handle '{}': number part is not numeric",
            handle
        )))
    })?;
    Ok((number, title))
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl Provider for GiteaProvider {
    fn name(&self) -> &str {
        "gitea"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>> {
        let path = self.repo_path(&format!("/pulls?state={}", state));
        let pulls: Vec<GiteaPull> = self.transport.fetch_paginated(&path).await?;
        Ok(pulls.iter().map(map_pull).collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        Ok(map_pull(&self.get_raw_pr(number).await?))
    }

    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let files: Vec<GiteaFile> = self
            .transport
            .fetch_paginated(&self.repo_path(&format!("/pulls/{}/files", number)))
            .await?;
        Ok(files.iter().map(map_file).collect())
    }

    /// Diff comments hang off reviews, so every review's comment list is
    /// fetched and flattened.
    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let reviews: Vec<GiteaReview> = self
            .transport
            .get_json(&self.repo_path(&format!("/pulls/{}/reviews", number)))
            .await?;
        let mut comments = Vec::new();
        for review in &reviews {
            let path = self.repo_path(&format!("/pulls/{}/reviews/{}/comments", number, review.id));
            let batch: Vec<GiteaReviewComment> = self.transport.get_json(&path).await?;
            comments.extend(batch.iter().map(map_review_comment));
        }
        Ok(comments)
    }

    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>> {
        let comments: Vec<GiteaIssueComment> = self
            .transport
            .fetch_paginated(&self.repo_path(&format!("/issues/{}/comments", number)))
            .await?;
        Ok(comments.iter().map(map_issue_comment).collect())
    }

    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>> {
        let reviews: Vec<GiteaReview> = self
            .transport
            .get_json(&self.repo_path(&format!("/pulls/{}/reviews", number)))
            .await?;
        Ok(reviews
            .iter()
            .filter_map(|r| {
                let state = map_review_state(&r.state)?;
                Some(Review {
                    id: r.id,
                    author: map_user(r.user.as_ref()),
                    state,
                    body: r.body.clone().filter(|b| !b.is_empty()),
                    submitted_at: r.submitted_at.clone(),
                })
            })
            .collect())
    }

    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>> {
        let commits: Vec<GiteaCommitEntry> = self
            .transport
            .fetch_paginated(&self.repo_path(&format!("/pulls/{}/commits", number)))
            .await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>> {
        let pull = self.get_raw_pr(number).await?;
        let statuses: Vec<GiteaStatus> = self
            .transport
            .fetch_paginated(&self.repo_path(&format!("/commits/{}/statuses", pull.head.sha)))
            .await?;
        Ok(statuses.iter().map(map_status).collect())
    }

    async fn get_review_threads(&self, _number: u64) -> Result<Vec<ReviewThread>> {
        Err(self.unsupported("review threads"))
    }

    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>> {
        let commit: GiteaCommitWithFiles = self
            .transport
            .get_json(&self.repo_path(&format!("/git/commits/{}", sha)))
            .await?;
        Ok(commit.files.iter().map(map_file).collect())
    }

    async fn get_my_prs(&self) -> Result<Vec<PullRequest>> {
        let (pulls, login) = self.open_prs_and_login().await?;
        Ok(pulls
            .iter()
            .filter(|p| p.user.as_ref().is_some_and(|u| u.login == login))
            .map(map_pull)
            .collect())
    }

    async fn get_review_requests(&self) -> Result<Vec<PullRequest>> {
        let (pulls, login) = self.open_prs_and_login().await?;
        Ok(pulls
            .iter()
            .filter(|p| p.requested_reviewers.iter().any(|u| u.login == login))
            .map(map_pull)
            .collect())
    }

    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>> {
        let (pulls, login) = self.open_prs_and_login().await?;
        Ok(pulls
            .iter()
            .filter(|p| {
                p.user.as_ref().is_some_and(|u| u.login == login)
                    || p.requested_reviewers.iter().any(|u| u.login == login)
            })
            .map(map_pull)
            .collect())
    }

    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()> {
        let request = CreateReviewRequest {
            event: event_str(event),
            body: (!body.is_empty()).then_some(body),
            comments: vec![],
        };
        self.transport
            .mutate_empty(
                Method::POST,
                &self.repo_path(&format!("/pulls/{}/reviews", number)),
                Some(&request),
            )
            .await
    }

    async fn create_pending_review(&self, _number: u64) -> Result<PendingReview> {
        Err(self.unsupported("pending reviews"))
    }

    async fn add_pending_review_comment(
        &self,
        _number: u64,
        _review_id: &str,
        _input: DiffCommentInput,
    ) -> Result<()> {
        Err(self.unsupported("pending reviews"))
    }

    async fn submit_pending_review(
        &self,
        _number: u64,
        _review_id: &str,
        _body: &str,
        _event: ReviewEvent,
    ) -> Result<()> {
        Err(self.unsupported("pending reviews"))
    }

    async fn discard_pending_review(&self, _number: u64, _review_id: &str) -> Result<()> {
        Err(self.unsupported("pending reviews"))
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment> {
        let comment: GiteaIssueComment = self
            .transport
            .mutate_json(
                Method::POST,
                &self.repo_path(&format!("/issues/{}/comments", number)),
                &CreateIssueCommentRequest { body },
            )
            .await?;
        Ok(map_issue_comment(&comment))
    }

    /// Standalone diff comments ride on a single-comment COMMENT review; the
    /// created comment is read back from that review.
    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment> {
        let (new_position, old_position) = match input.side {
            DiffSide::Right => (Some(input.line), None),
            DiffSide::Left => (None, Some(input.line)),
        };
        let request = CreateReviewRequest {
            event: "COMMENT",
            body: None,
            comments: vec![ReviewCommentInput {
                path: &input.path,
                body: &input.body,
                new_position,
                old_position,
            }],
        };
        let review: GiteaReview = self
            .transport
            .mutate_json(
                Method::POST,
                &self.repo_path(&format!("/pulls/{}/reviews", number)),
                &request,
            )
            .await?;
        let comments: Vec<GiteaReviewComment> = self
            .transport
            .get_json(&self.repo_path(&format!(
                "/pulls/{}/reviews/{}/comments",
                number, review.id
            )))
            .await?;
        let comment = comments.first().ok_or_else(|| {
            ProviderKind::Gitea
                .error(HttpFailure::message("created review contains no comment"))
        })?;
        Ok(map_review_comment(comment))
    }

    async fn reply_to_comment(&self, _number: u64, _comment_id: i64, _body: &str) -> Result<Comment> {
        Err(self.unsupported("threaded comment replies"))
    }

    async fn update_comment(&self, _number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let comment: GiteaIssueComment = self
            .transport
            .mutate_json(
                Method::PATCH,
                &self.repo_path(&format!("/issues/comments/{}", comment_id)),
                &CreateIssueCommentRequest { body },
            )
            .await?;
        Ok(Comment {
            id: comment.id,
            body: comment.body,
            author: map_user(comment.user.as_ref()),
            path: None,
            line: None,
            side: None,
            in_reply_to: None,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    async fn delete_comment(&self, _number: u64, comment_id: i64) -> Result<()> {
        self.transport
            .mutate_empty::<()>(
                Method::DELETE,
                &self.repo_path(&format!("/issues/comments/{}", comment_id)),
                None,
            )
            .await
    }

    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::POST,
                &self.repo_path(&format!("/pulls/{}/merge", number)),
                Some(&MergeRequestBody {
                    strategy: strategy.as_str(),
                }),
            )
            .await
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        self.patch_pr(number, &json!({"state": "closed"})).await
    }

    async fn reopen_pr(&self, number: u64) -> Result<()> {
        self.patch_pr(number, &json!({"state": "open"})).await
    }

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()> {
        self.patch_pr(number, &json!({"title": title})).await
    }

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()> {
        self.patch_pr(number, &json!({"body": body})).await
    }

    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Err(ProviderKind::Gitea
                .error(HttpFailure::message("no reviewers given to re-request")));
        }
        self.transport
            .mutate_empty(
                Method::POST,
                &self.repo_path(&format!("/pulls/{}/requested_reviewers", number)),
                Some(&RequestReviewersBody { reviewers }),
            )
            .await
    }

    async fn resolve_thread(&self, _thread_id: &str) -> Result<()> {
        Err(self.unsupported("review thread resolution"))
    }

    async fn unresolve_thread(&self, _thread_id: &str) -> Result<()> {
        Err(self.unsupported("review thread resolution"))
    }

    async fn convert_to_draft(&self, handle: &str) -> Result<()> {
        let (number, title) = parse_draft_handle(handle)?;
        if title.starts_with(WIP_PREFIX) || title.starts_with("WIP:") {
            return Ok(());
        }
        self.patch_pr(number, &json!({"title": format!("{}{}", WIP_PREFIX, title)}))
            .await
    }

    async fn mark_ready_for_review(&self, handle: &str) -> Result<()> {
        let (number, title) = parse_draft_handle(handle)?;
        let Some(bare) = title
            .strip_prefix(WIP_PREFIX)
            .or_else(|| title.strip_prefix("WIP:"))
        else {
            return Ok(());
        };
        self.patch_pr(number, &json!({"title": bare.trim_start()}))
            .await
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let ids = self.resolve_label_ids(labels).await?;
        self.transport
            .mutate_empty(
                Method::POST,
                &self.repo_path(&format!("/issues/{}/labels", number)),
                Some(&AddLabelsBody { labels: ids }),
            )
            .await
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        let wanted = [label.to_string()];
        let ids = self.resolve_label_ids(&wanted).await?;
        self.transport
            .mutate_empty::<()>(
                Method::DELETE,
                &self.repo_path(&format!("/issues/{}/labels/{}", number, ids[0])),
                None,
            )
            .await
    }

    async fn get_current_user(&self) -> Result<User> {
        let me: GiteaUser = self.transport.get_json("/user").await?;
        Ok(map_user(Some(&me)).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pull(number: u64, title: &str, login: &str) -> GiteaPull {
        GiteaPull {
            number,
            title: title.to_string(),
            body: None,
            state: "open".to_string(),
            merged: false,
            user: Some(GiteaUser {
                id: 1,
                login: login.to_string(),
                full_name: None,
                avatar_url: None,
            }),
            head: crate::types::GiteaBranchInfo {
                ref_name: "feature".to_string(),
                sha: "abc".to_string(),
            },
            base: crate::types::GiteaBranchInfo {
                ref_name: "main".to_string(),
                sha: "def".to_string(),
            },
            labels: vec![],
            requested_reviewers: vec![],
            html_url: "https://gitea.example/pr/1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_map_review_state() {
        assert_eq!(map_review_state("APPROVED").as_deref(), Some("APPROVED"));
        assert_eq!(
            map_review_state("REQUEST_CHANGES").as_deref(),
            Some("CHANGES_REQUESTED")
        );
        assert_eq!(map_review_state("COMMENT").as_deref(), Some("COMMENTED"));
        assert_eq!(map_review_state("PENDING"), None);
    }

    #[test]
    fn test_parse_draft_handle() {
        assert_eq!(parse_draft_handle("7:Fix the bug").unwrap(), (7, "Fix the bug"));
        // Colons in the title stay with the title
        assert_eq!(parse_draft_handle("7:fix: bug").unwrap(), (7, "fix: bug"));
        assert!(parse_draft_handle("no-separator").is_err());
        assert!(parse_draft_handle("x:title").is_err());
    }

    #[test]
    fn test_wip_title_marks_draft() {
        let pr = map_pull(&sample_pull(1, "WIP: half done", "dev"));
        assert!(pr.draft);
        let pr = map_pull(&sample_pull(1, "done", "dev"));
        assert!(!pr.draft);
    }

    #[test]
    fn test_map_state_merged_wins() {
        assert_eq!(map_state("closed", true), PrState::Merged);
        assert_eq!(map_state("closed", false), PrState::Closed);
        assert_eq!(map_state("open", false), PrState::Open);
    }

    #[test]
    fn test_review_comment_side_from_positions() {
        let mut comment = GiteaReviewComment {
            id: 1,
            body: "x".to_string(),
            user: None,
            path: Some("src/lib.rs".to_string()),
            position: Some(5),
            original_position: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: None,
        };
        let mapped = map_review_comment(&comment);
        assert_eq!(mapped.side, Some(DiffSide::Right));
        assert_eq!(mapped.line, Some(5));

        comment.position = None;
        comment.original_position = Some(3);
        let mapped = map_review_comment(&comment);
        assert_eq!(mapped.side, Some(DiffSide::Left));
        assert_eq!(mapped.line, Some(3));
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_provider(server: &MockServer) -> GiteaProvider {
            GiteaProvider::new(&ProviderConfig {
                kind: ProviderKind::Gitea,
                base_url: Some(server.base_url()),
                token: "test-token".to_string(),
                owner: "octo".to_string(),
                repo: "reviewer".to_string(),
            })
        }

        fn pull_json(number: u64, title: &str, login: &str) -> serde_json::Value {
            serde_json::json!({
                "number": number,
                "title": title,
                "state": "open",
                "merged": false,
                "user": {"id": 1, "login": login},
                "head": {"ref": "feature", "sha": "abc123"},
                "base": {"ref": "main", "sha": "def456"},
                "labels": [],
                "requested_reviewers": [{"id": 2, "login": "rae"}],
                "html_url": "https://gitea.example/octo/reviewer/pulls/1",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            })
        }

        #[tokio::test]
        async fn test_list_prs_uses_token_auth() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/repos/octo/reviewer/pulls")
                    .query_param("state", "open")
                    .header("authorization", "token test-token");
                then.status(200)
                    .json_body(serde_json::json!([pull_json(1, "First", "dev")]));
            });

            let provider = create_test_provider(&server);
            let prs = provider.list_prs(PrStateFilter::Open).await.unwrap();

            assert_eq!(prs.len(), 1);
            assert_eq!(prs[0].head_ref, "feature");
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_my_prs_filters_by_author() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/user");
                then.status(200)
                    .json_body(serde_json::json!({"id": 1, "login": "dev"}));
            });
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/octo/reviewer/pulls");
                then.status(200).json_body(serde_json::json!([
                    pull_json(1, "Mine", "dev"),
                    pull_json(2, "Theirs", "someone-else"),
                ]));
            });

            let provider = create_test_provider(&server);
            let prs = provider.get_my_prs().await.unwrap();

            assert_eq!(prs.len(), 1);
            assert_eq!(prs[0].number, 1);
        }

        #[tokio::test]
        async fn test_review_requests_filter_by_requested_reviewer() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/user");
                then.status(200)
                    .json_body(serde_json::json!({"id": 2, "login": "rae"}));
            });
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/octo/reviewer/pulls");
                then.status(200)
                    .json_body(serde_json::json!([pull_json(1, "First", "dev")]));
            });

            let provider = create_test_provider(&server);
            let prs = provider.get_review_requests().await.unwrap();
            assert_eq!(prs.len(), 1);
        }

        #[tokio::test]
        async fn test_submit_review_approve_body() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v1/repos/octo/reviewer/pulls/1/reviews")
                    .json_body(serde_json::json!({"event": "APPROVED", "body": "ship it"}));
                then.status(200)
                    .json_body(serde_json::json!({"id": 10, "state": "APPROVED"}));
            });

            let provider = create_test_provider(&server);
            provider
                .submit_review(1, "ship it", ReviewEvent::Approve)
                .await
                .unwrap();
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_merge_sends_do_field() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v1/repos/octo/reviewer/pulls/1/merge")
                    .json_body(serde_json::json!({"Do": "squash"}));
                then.status(200);
            });

            let provider = create_test_provider(&server);
            provider.merge_pr(1, MergeStrategy::Squash).await.unwrap();
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_add_labels_resolves_names_to_ids() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/octo/reviewer/labels");
                then.status(200).json_body(serde_json::json!([
                    {"id": 2, "name": "bug"},
                    {"id": 5, "name": "enhancement"},
                ]));
            });
            let attach = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v1/repos/octo/reviewer/issues/1/labels")
                    .json_body(serde_json::json!({"labels": [2]}));
                then.status(200);
            });

            let provider = create_test_provider(&server);
            provider.add_labels(1, &["bug".to_string()]).await.unwrap();
            attach.assert_hits(1);

            let err = provider
                .add_labels(1, &["missing".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, revu_core::ApiError::Gitea(_)));
        }

        #[tokio::test]
        async fn test_convert_to_draft_prefixes_title() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/api/v1/repos/octo/reviewer/pulls/7")
                    .json_body(serde_json::json!({"title": "WIP: Fix the bug"}));
                then.status(200);
            });

            let provider = create_test_provider(&server);
            provider.convert_to_draft("7:Fix the bug").await.unwrap();
            mock.assert_hits(1);

            // Already-prefixed titles short-circuit without a request
            provider.convert_to_draft("7:WIP: Fix the bug").await.unwrap();
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_add_diff_comment_creates_review_and_reads_back() {
            let server = MockServer::start();
            let create = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v1/repos/octo/reviewer/pulls/1/reviews")
                    .body_includes("\"new_position\":12")
                    .body_includes("\"path\":\"src/lib.rs\"");
                then.status(200)
                    .json_body(serde_json::json!({"id": 44, "state": "COMMENT"}));
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/repos/octo/reviewer/pulls/1/reviews/44/comments");
                then.status(200).json_body(serde_json::json!([{
                    "id": 901,
                    "body": "nit",
                    "path": "src/lib.rs",
                    "position": 12,
                    "created_at": "2024-01-01T00:00:00Z"
                }]));
            });

            let provider = create_test_provider(&server);
            let comment = provider
                .add_diff_comment(
                    1,
                    DiffCommentInput {
                        body: "nit".to_string(),
                        commit_sha: None,
                        path: "src/lib.rs".to_string(),
                        line: 12,
                        side: DiffSide::Right,
                    },
                )
                .await
                .unwrap();

            assert_eq!(comment.id, 901);
            assert_eq!(comment.side, Some(DiffSide::Right));
            create.assert_hits(1);
        }

        #[tokio::test]
        async fn test_checks_walk_through_head_sha() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/octo/reviewer/pulls/1");
                then.status(200).json_body(pull_json(1, "First", "dev"));
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/repos/octo/reviewer/commits/abc123/statuses");
                then.status(200).json_body(serde_json::json!([
                    {"id": 1, "status": "success", "context": "ci/build"},
                    {"id": 2, "status": "pending", "context": "ci/test"},
                ]));
            });

            let provider = create_test_provider(&server);
            let checks = provider.get_pr_checks(1).await.unwrap();

            assert_eq!(checks.len(), 2);
            assert_eq!(checks[0].conclusion.as_deref(), Some("success"));
            assert_eq!(checks[1].status, "in_progress");
            assert_eq!(checks[1].conclusion, None);
        }

        #[tokio::test]
        async fn test_unsupported_operations_fail_typed() {
            let server = MockServer::start();
            let provider = create_test_provider(&server);

            assert!(provider.get_review_threads(1).await.is_err());
            assert!(provider.resolve_thread("x").await.is_err());
            assert!(provider.create_pending_review(1).await.is_err());
            assert!(provider.reply_to_comment(1, 5, "hi").await.is_err());
        }
    }
}
