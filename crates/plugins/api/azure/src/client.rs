//! Azure DevOps API client implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use revu_core::error::{HttpFailure, ProviderKind, Result};
use revu_core::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, Provider, ProviderCapabilities,
    ProviderConfig, PullRequest, Review, ReviewEvent, ReviewThread, ThreadComment, User,
};
use revu_transport::{AuthScheme, CancellationToken, Transport};

use crate::types::{
    AzureComment, AzureCommit, AzureCommitChanges, AzureConnectionData, AzureFilePosition,
    AzureIdentity, AzureIteration, AzureIterationChanges, AzureList, AzurePull, AzureStatus,
    AzureThread, CreateCommentBody, CreateThreadBody, ThreadContextBody, VoteBody,
};
use crate::{API_VERSION, DEFAULT_AZURE_URL};

/// Comment ids are only unique within their thread, so the unified id packs
/// both: `thread_id * STRIDE + comment_id`. Azure numbers comments from 1
/// per thread, far below the stride.
const COMMENT_ID_STRIDE: i64 = 1_000_000;

/// Azure DevOps provider.
pub struct AzureProvider {
    org_url: String,
    transport: Transport,
    capabilities: ProviderCapabilities,
}

impl AzureProvider {
    /// Create a provider from a repository context. The config owner field
    /// carries `"{organization}/{project}"`.
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a provider whose in-flight calls stop when `cancel` fires.
    pub fn with_cancellation(config: &ProviderConfig, cancel: CancellationToken) -> Self {
        let host = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AZURE_URL.to_string());
        let host = host.trim_end_matches('/');
        let (organization, project) = config
            .owner
            .split_once('/')
            .unwrap_or((config.owner.as_str(), ""));
        let org_url = format!("{}/{}", host, organization);
        let base = format!(
            "{}/{}/_apis/git/repositories/{}",
            org_url, project, config.repo
        );

        let transport = Transport::new(ProviderKind::AzureDevOps, base, config.token.clone())
            .with_auth_scheme(AuthScheme::Basic {
                user: String::new(),
            })
            .with_cancellation(cancel);

        Self {
            org_url,
            transport,
            capabilities: ProviderCapabilities {
                draft_prs: true,
                review_threads: true,
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

    async fn get_raw_pr(&self, number: u64) -> Result<AzurePull> {
        self.transport
            .get_json(&versioned(&format!("/pullRequests/{}", number)))
            .await
    }

    async fn fetch_threads(&self, number: u64) -> Result<Vec<AzureThread>> {
        let threads: AzureList<AzureThread> = self
            .transport
            .get_json(&versioned(&format!("/pullRequests/{}/threads", number)))
            .await?;
        Ok(threads
            .value
            .into_iter()
            .filter(|t| !t.is_deleted)
            .collect())
    }

    async fn my_identity(&self) -> Result<AzureConnectionData> {
        let url = format!(
            "{}/_apis/connectionData?api-version={}",
            self.org_url, API_VERSION
        );
        self.transport.get_json(&url).await
    }

    async fn post_thread(
        &self,
        number: u64,
        body: &str,
        context: Option<ThreadContextBody<'_>>,
    ) -> Result<AzureThread> {
        let request = CreateThreadBody {
            comments: vec![CreateCommentBody {
                content: body,
                parent_comment_id: 0,
                comment_type: "text",
            }],
            status: "active",
            thread_context: context,
        };
        self.transport
            .mutate_json(
                Method::POST,
                &versioned(&format!("/pullRequests/{}/threads", number)),
                &request,
            )
            .await
    }

    async fn cast_vote(&self, number: u64, vote: i32) -> Result<()> {
        let me = self.my_identity().await?;
        let path = versioned(&format!(
            "/pullRequests/{}/reviewers/{}",
            number, me.authenticated_user.id
        ));
        self.transport
            .mutate_empty(Method::PUT, &path, Some(&VoteBody { vote }))
            .await
    }

    async fn search_prs(&self, criteria: &str) -> Result<Vec<PullRequest>> {
        let pulls: AzureList<AzurePull> = self
            .transport
            .get_json(&versioned(&format!("/pullRequests?{}", criteria)))
            .await?;
        Ok(pulls.value.iter().map(map_pull).collect())
    }

    async fn patch_pr(&self, number: u64, body: &serde_json::Value) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PATCH,
                &versioned(&format!("/pullRequests/{}", number)),
                Some(body),
            )
            .await
    }
}

fn versioned(path: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}api-version={}", path, separator, API_VERSION)
}

fn encode_comment_id(thread_id: u64, comment_id: u64) -> i64 {
    thread_id as i64 * COMMENT_ID_STRIDE + comment_id as i64
}

fn decode_comment_id(id: i64) -> (u64, u64) {
    ((id / COMMENT_ID_STRIDE) as u64, (id % COMMENT_ID_STRIDE) as u64)
}

// =============================================================================
// Mapping functions: Azure types -> Unified types
// =============================================================================

fn map_identity(identity: Option<&AzureIdentity>) -> Option<User> {
    identity.map(|i| User {
        login: i
            .unique_name
            .clone()
            .or_else(|| i.display_name.clone())
            .unwrap_or_default(),
        id: None,
        name: i.display_name.clone(),
        avatar_url: i.image_url.clone(),
    })
}

fn map_status_state(status: &str) -> PrState {
    match status {
        "completed" => PrState::Merged,
        "abandoned" => PrState::Closed,
        _ => PrState::Open,
    }
}

fn strip_ref(ref_name: &str) -> String {
    ref_name
        .strip_prefix("refs/heads/")
        .unwrap_or(ref_name)
        .to_string()
}

fn map_pull(pull: &AzurePull) -> PullRequest {
    PullRequest {
        number: pull.pull_request_id,
        title: pull.title.clone(),
        body: pull.description.clone(),
        state: map_status_state(&pull.status),
        draft: pull.is_draft,
        merged: pull.status == "completed",
        author: map_identity(pull.created_by.as_ref()),
        head_ref: strip_ref(&pull.source_ref_name),
        base_ref: strip_ref(&pull.target_ref_name),
        labels: pull.labels.iter().map(|l| l.name.clone()).collect(),
        additions: None,
        deletions: None,
        changed_files: None,
        url: pull.url.clone().unwrap_or_default(),
        created_at: pull.creation_date.clone(),
        updated_at: pull.creation_date.clone(),
    }
}

fn vote_state(vote: i32) -> &'static str {
    match vote {
        10 => "APPROVED",
        5 => "APPROVED_WITH_SUGGESTIONS",
        -5 => "WAITING_FOR_AUTHOR",
        _ => "REJECTED",
    }
}

fn thread_resolved(status: Option<&str>) -> bool {
    matches!(status, Some("fixed" | "closed" | "wontFix" | "byDesign"))
}

fn map_thread_comment(thread: &AzureThread, comment: &AzureComment) -> Comment {
    let context = thread.thread_context.as_ref();
    let (line, side) = match context {
        Some(ctx) => match (&ctx.right_file_start, &ctx.left_file_start) {
            (Some(right), _) => (Some(right.line), Some(DiffSide::Right)),
            (None, Some(left)) => (Some(left.line), Some(DiffSide::Left)),
            (None, None) => (None, None),
        },
        None => (None, None),
    };
    Comment {
        id: encode_comment_id(thread.id, comment.id),
        body: comment.content.clone().unwrap_or_default(),
        author: map_identity(comment.author.as_ref()),
        path: context.map(|c| c.file_path.trim_start_matches('/').to_string()),
        line,
        side,
        in_reply_to: (comment.parent_comment_id > 0)
            .then(|| encode_comment_id(thread.id, comment.parent_comment_id)),
        created_at: comment.published_date.clone().unwrap_or_default(),
        updated_at: comment.last_updated_date.clone(),
    }
}

fn is_text_comment(comment: &AzureComment) -> bool {
    !comment.is_deleted && comment.comment_type.as_deref() != Some("system")
}

fn map_change(entry: &crate::types::AzureChangeEntry) -> FileChange {
    let status = match entry.change_type.as_str() {
        "add" => "added",
        "delete" => "removed",
        "rename" => "renamed",
        _ => "modified",
    };
    FileChange {
        path: entry.item.path.trim_start_matches('/').to_string(),
        previous_path: None,
        status: status.to_string(),
        additions: 0,
        deletions: 0,
        patch: None,
    }
}

fn map_commit(commit: &AzureCommit) -> Commit {
    Commit {
        sha: commit.commit_id.clone(),
        message: commit.comment.clone().unwrap_or_default(),
        author_login: commit.author.as_ref().and_then(|a| a.name.clone()),
        authored_at: commit.author.as_ref().and_then(|a| a.date.clone()),
    }
}

fn map_check(status: &AzureStatus) -> CheckRun {
    let terminal = matches!(status.state.as_str(), "succeeded" | "failed" | "error");
    CheckRun {
        name: status
            .context
            .as_ref()
            .and_then(|c| c.name.clone())
            .unwrap_or_default(),
        status: if terminal {
            "completed".to_string()
        } else {
            "in_progress".to_string()
        },
        conclusion: terminal.then(|| status.state.clone()),
        url: status.target_url.clone(),
    }
}

fn merge_strategy_name(strategy: MergeStrategy) -> &'static str {
    match strategy {
        MergeStrategy::Merge => "noFastForward",
        MergeStrategy::Squash => "squash",
        MergeStrategy::Rebase => "rebase",
    }
}

fn parse_numeric_handle(handle: &str, what: &str) -> Result<u64> {
    handle.parse().map_err(|_| {
        ProviderKind::AzureDevOps.error(HttpFailure::message(format!(
            "malformed {} '{}': expected a numeric id",
            what, handle
        )))
    })
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl Provider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>> {
        // Closed spans both completed and abandoned, which the search
        // criteria cannot express in one value.
        let status = match state {
            PrStateFilter::Open => "active",
            PrStateFilter::Closed | PrStateFilter::All => "all",
        };
        let mut prs = self
            .search_prs(&format!("searchCriteria.status={}", status))
            .await?;
        if state == PrStateFilter::Closed {
            prs.retain(|p| p.state != PrState::Open);
        }
        Ok(prs)
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        Ok(map_pull(&self.get_raw_pr(number).await?))
    }

    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let iterations: AzureList<AzureIteration> = self
            .transport
            .get_json(&versioned(&format!("/pullRequests/{}/iterations", number)))
            .await?;
        let Some(latest) = iterations.value.last() else {
            return Ok(vec![]);
        };
        let changes: AzureIterationChanges = self
            .transport
            .get_json(&versioned(&format!(
                "/pullRequests/{}/iterations/{}/changes",
                number, latest.id
            )))
            .await?;
        Ok(changes.change_entries.iter().map(map_change).collect())
    }

    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let threads = self.fetch_threads(number).await?;
        Ok(threads
            .iter()
            .filter(|t| t.thread_context.is_some())
            .flat_map(|t| {
                t.comments
                    .iter()
                    .filter(|c| is_text_comment(c))
                    .map(move |c| map_thread_comment(t, c))
            })
            .collect())
    }

    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>> {
        let threads = self.fetch_threads(number).await?;
        Ok(threads
            .iter()
            .filter(|t| t.thread_context.is_none())
            .flat_map(|t| {
                t.comments.iter().filter(|c| is_text_comment(c)).map(move |c| {
                    IssueComment {
                        id: encode_comment_id(t.id, c.id),
                        body: c.content.clone().unwrap_or_default(),
                        author: map_identity(c.author.as_ref()),
                        created_at: c.published_date.clone().unwrap_or_default(),
                        updated_at: c.last_updated_date.clone(),
                    }
                })
            })
            .collect())
    }

    /// Reviews are reviewer votes on the PR itself.
    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>> {
        let pull = self.get_raw_pr(number).await?;
        Ok(pull
            .reviewers
            .iter()
            .filter(|r| r.vote != 0)
            .map(|r| Review {
                id: 0,
                author: Some(User {
                    login: r
                        .unique_name
                        .clone()
                        .or_else(|| r.display_name.clone())
                        .unwrap_or_default(),
                    id: None,
                    name: r.display_name.clone(),
                    avatar_url: None,
                }),
                state: vote_state(r.vote).to_string(),
                body: None,
                submitted_at: None,
            })
            .collect())
    }

    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>> {
        let commits: AzureList<AzureCommit> = self
            .transport
            .get_json(&versioned(&format!("/pullRequests/{}/commits", number)))
            .await?;
        Ok(commits.value.iter().map(map_commit).collect())
    }

    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>> {
        let statuses: AzureList<AzureStatus> = self
            .transport
            .get_json(&versioned(&format!("/pullRequests/{}/statuses", number)))
            .await?;
        Ok(statuses.value.iter().map(map_check).collect())
    }

    async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>> {
        let threads = self.fetch_threads(number).await?;
        Ok(threads
            .iter()
            .filter(|t| t.thread_context.is_some())
            .map(|t| ReviewThread {
                // Handle carries the PR number so resolution can address the
                // thread under its PR later.
                id: format!("{}:{}", number, t.id),
                is_resolved: thread_resolved(t.status.as_deref()),
                comments: t
                    .comments
                    .iter()
                    .filter(|c| is_text_comment(c))
                    .map(|c| ThreadComment {
                        database_id: encode_comment_id(t.id, c.id),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>> {
        let changes: AzureCommitChanges = self
            .transport
            .get_json(&versioned(&format!("/commits/{}/changes", sha)))
            .await?;
        Ok(changes.changes.iter().map(map_change).collect())
    }

    async fn get_my_prs(&self) -> Result<Vec<PullRequest>> {
        let me = self.my_identity().await?;
        self.search_prs(&format!(
            "searchCriteria.status=active&searchCriteria.creatorId={}",
            me.authenticated_user.id
        ))
        .await
    }

    async fn get_review_requests(&self) -> Result<Vec<PullRequest>> {
        let me = self.my_identity().await?;
        self.search_prs(&format!(
            "searchCriteria.status=active&searchCriteria.reviewerId={}",
            me.authenticated_user.id
        ))
        .await
    }

    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>> {
        let mut prs = self.get_my_prs().await?;
        for pr in self.get_review_requests().await? {
            if !prs.iter().any(|p| p.number == pr.number) {
                prs.push(pr);
            }
        }
        Ok(prs)
    }

    /// Verdicts are votes cast by the caller on themselves as reviewer; a
    /// non-empty body becomes a separate conversation thread.
    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()> {
        match event {
            ReviewEvent::Approve => self.cast_vote(number, 10).await?,
            ReviewEvent::RequestChanges => self.cast_vote(number, -10).await?,
            ReviewEvent::Comment => {}
        }
        if !body.is_empty() || matches!(event, ReviewEvent::Comment) {
            self.post_thread(number, body, None).await?;
        }
        Ok(())
    }

    async fn create_pending_review(&self, _number: u64) -> Result<PendingReview> {
        Err(ProviderKind::AzureDevOps
            .error(HttpFailure::message("pending reviews are not supported on Azure DevOps")))
    }

    async fn add_pending_review_comment(
        &self,
        _number: u64,
        _review_id: &str,
        _input: DiffCommentInput,
    ) -> Result<()> {
        Err(ProviderKind::AzureDevOps
            .error(HttpFailure::message("pending reviews are not supported on Azure DevOps")))
    }

    async fn submit_pending_review(
        &self,
        _number: u64,
        _review_id: &str,
        _body: &str,
        _event: ReviewEvent,
    ) -> Result<()> {
        Err(ProviderKind::AzureDevOps
            .error(HttpFailure::message("pending reviews are not supported on Azure DevOps")))
    }

    async fn discard_pending_review(&self, _number: u64, _review_id: &str) -> Result<()> {
        Err(ProviderKind::AzureDevOps
            .error(HttpFailure::message("pending reviews are not supported on Azure DevOps")))
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment> {
        let thread = self.post_thread(number, body, None).await?;
        let comment = thread.comments.first().ok_or_else(|| {
            ProviderKind::AzureDevOps
                .error(HttpFailure::message("created thread contains no comment"))
        })?;
        Ok(IssueComment {
            id: encode_comment_id(thread.id, comment.id),
            body: comment.content.clone().unwrap_or_default(),
            author: map_identity(comment.author.as_ref()),
            created_at: comment.published_date.clone().unwrap_or_default(),
            updated_at: comment.last_updated_date.clone(),
        })
    }

    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment> {
        let position = AzureFilePosition { line: input.line };
        let context = match input.side {
            DiffSide::Right => ThreadContextBody {
                file_path: &input.path,
                right_file_start: Some(position.clone()),
                right_file_end: Some(position),
                left_file_start: None,
                left_file_end: None,
            },
            DiffSide::Left => ThreadContextBody {
                file_path: &input.path,
                right_file_start: None,
                right_file_end: None,
                left_file_start: Some(position.clone()),
                left_file_end: Some(position),
            },
        };
        let thread = self
            .post_thread(number, &input.body, Some(context))
            .await?;
        let comment = thread.comments.first().ok_or_else(|| {
            ProviderKind::AzureDevOps
                .error(HttpFailure::message("created thread contains no comment"))
        })?;
        Ok(map_thread_comment(&thread, comment))
    }

    async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let (thread_id, parent_id) = decode_comment_id(comment_id);
        let path = versioned(&format!(
            "/pullRequests/{}/threads/{}/comments",
            number, thread_id
        ));
        let comment: AzureComment = self
            .transport
            .mutate_json(
                Method::POST,
                &path,
                &CreateCommentBody {
                    content: body,
                    parent_comment_id: parent_id,
                    comment_type: "text",
                },
            )
            .await?;
        Ok(Comment {
            id: encode_comment_id(thread_id, comment.id),
            body: comment.content.unwrap_or_default(),
            author: map_identity(comment.author.as_ref()),
            path: None,
            line: None,
            side: None,
            in_reply_to: Some(comment_id),
            created_at: comment.published_date.unwrap_or_default(),
            updated_at: comment.last_updated_date,
        })
    }

    async fn update_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let (thread_id, native_id) = decode_comment_id(comment_id);
        let path = versioned(&format!(
            "/pullRequests/{}/threads/{}/comments/{}",
            number, thread_id, native_id
        ));
        let comment: AzureComment = self
            .transport
            .mutate_json(Method::PATCH, &path, &json!({"content": body}))
            .await?;
        Ok(Comment {
            id: comment_id,
            body: comment.content.unwrap_or_default(),
            author: map_identity(comment.author.as_ref()),
            path: None,
            line: None,
            side: None,
            in_reply_to: (comment.parent_comment_id > 0)
                .then(|| encode_comment_id(thread_id, comment.parent_comment_id)),
            created_at: comment.published_date.unwrap_or_default(),
            updated_at: comment.last_updated_date,
        })
    }

    async fn delete_comment(&self, number: u64, comment_id: i64) -> Result<()> {
        let (thread_id, native_id) = decode_comment_id(comment_id);
        let path = versioned(&format!(
            "/pullRequests/{}/threads/{}/comments/{}",
            number, thread_id, native_id
        ));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        let pull = self.get_raw_pr(number).await?;
        let commit = pull.last_merge_source_commit.ok_or_else(|| {
            ProviderKind::AzureDevOps.error(HttpFailure::message(
                "pull request has no merge source commit; cannot complete",
            ))
        })?;
        self.patch_pr(
            number,
            &json!({
                "status": "completed",
                "lastMergeSourceCommit": {"commitId": commit.commit_id},
                "completionOptions": {"mergeStrategy": merge_strategy_name(strategy)},
            }),
        )
        .await
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        self.patch_pr(number, &json!({"status": "abandoned"})).await
    }

    async fn reopen_pr(&self, number: u64) -> Result<()> {
        self.patch_pr(number, &json!({"status": "active"})).await
    }

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()> {
        self.patch_pr(number, &json!({"title": title})).await
    }

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()> {
        self.patch_pr(number, &json!({"description": body})).await
    }

    /// Reviewers are addressed by identity GUID; adding one resets their
    /// vote to 0.
    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Err(ProviderKind::AzureDevOps
                .error(HttpFailure::message("no reviewers given to re-request")));
        }
        for reviewer in reviewers {
            let path = versioned(&format!(
                "/pullRequests/{}/reviewers/{}",
                number, reviewer
            ));
            self.transport
                .mutate_empty(Method::PUT, &path, Some(&VoteBody { vote: 0 }))
                .await?;
        }
        Ok(())
    }

    async fn resolve_thread(&self, thread_id: &str) -> Result<()> {
        // Thread handles carry the PR number like GitLab's: "{pr}:{thread}".
        let (number, thread) = split_thread_handle(thread_id)?;
        let path = versioned(&format!("/pullRequests/{}/threads/{}", number, thread));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"status": "fixed"})))
            .await
    }

    async fn unresolve_thread(&self, thread_id: &str) -> Result<()> {
        let (number, thread) = split_thread_handle(thread_id)?;
        let path = versioned(&format!("/pullRequests/{}/threads/{}", number, thread));
        self.transport
            .mutate_empty(Method::PATCH, &path, Some(&json!({"status": "active"})))
            .await
    }

    async fn convert_to_draft(&self, handle: &str) -> Result<()> {
        let number = parse_numeric_handle(handle, "draft handle")?;
        self.patch_pr(number, &json!({"isDraft": true})).await
    }

    async fn mark_ready_for_review(&self, handle: &str) -> Result<()> {
        let number = parse_numeric_handle(handle, "draft handle")?;
        self.patch_pr(number, &json!({"isDraft": false})).await
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        for label in labels {
            let path = versioned(&format!("/pullRequests/{}/labels", number));
            self.transport
                .mutate_empty(Method::POST, &path, Some(&json!({"name": label})))
                .await?;
        }
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        let path = versioned(&format!("/pullRequests/{}/labels/{}", number, label));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn get_current_user(&self) -> Result<User> {
        let me = self.my_identity().await?;
        Ok(User {
            login: me
                .authenticated_user
                .provider_display_name
                .clone()
                .unwrap_or_else(|| me.authenticated_user.id.clone()),
            id: None,
            name: me.authenticated_user.provider_display_name,
            avatar_url: None,
        })
    }
}

/// Thread handles are `"{pr_number}:{thread_id}"` since Azure threads are
/// addressed under their PR.
fn split_thread_handle(handle: &str) -> Result<(u64, u64)> {
    let parse = |s: &str, what: &str| -> Result<u64> {
        s.parse().map_err(|_| {
            ProviderKind::AzureDevOps.error(HttpFailure::message(format!(
                "malformed thread handle '{}': {} is not numeric",
                handle, what
            )))
        })
    };
    match handle.split_once(':') {
        Some((number, thread)) => Ok((parse(number, "pr number")?, parse(thread, "thread id")?)),
        None => Err(ProviderKind::AzureDevOps.error(HttpFailure::message(format!(
            "malformed thread handle '{}': expected '{{pr}}:{{thread}}'",
            handle
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_id_round_trip() {
        let encoded = encode_comment_id(42, 3);
        assert_eq!(decode_comment_id(encoded), (42, 3));
        assert_eq!(encoded, 42_000_003);
    }

    #[test]
    fn test_vote_state() {
        assert_eq!(vote_state(10), "APPROVED");
        assert_eq!(vote_state(5), "APPROVED_WITH_SUGGESTIONS");
        assert_eq!(vote_state(-5), "WAITING_FOR_AUTHOR");
        assert_eq!(vote_state(-10), "REJECTED");
    }

    #[test]
    fn test_strip_ref() {
        assert_eq!(strip_ref("refs/heads/feature/x"), "feature/x");
        assert_eq!(strip_ref("main"), "main");
    }

    #[test]
    fn test_thread_resolved() {
        assert!(thread_resolved(Some("fixed")));
        assert!(thread_resolved(Some("wontFix")));
        assert!(!thread_resolved(Some("active")));
        assert!(!thread_resolved(Some("pending")));
        assert!(!thread_resolved(None));
    }

    #[test]
    fn test_split_thread_handle() {
        assert_eq!(split_thread_handle("7:15").unwrap(), (7, 15));
        assert!(split_thread_handle("15").is_err());
        assert!(split_thread_handle("a:b").is_err());
    }

    #[test]
    fn test_versioned_appends_api_version() {
        assert_eq!(versioned("/pullRequests/1"), "/pullRequests/1?api-version=7.1");
        assert_eq!(
            versioned("/pullRequests?searchCriteria.status=active"),
            "/pullRequests?searchCriteria.status=active&api-version=7.1"
        );
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_provider(server: &MockServer) -> AzureProvider {
            AzureProvider::new(&ProviderConfig {
                kind: ProviderKind::AzureDevOps,
                base_url: Some(server.base_url()),
                token: "pat-token".to_string(),
                owner: "contoso/webapp".to_string(),
                repo: "backend".to_string(),
            })
        }

        fn pull_json(id: u64) -> serde_json::Value {
            serde_json::json!({
                "pullRequestId": id,
                "title": format!("PR {}", id),
                "status": "active",
                "isDraft": false,
                "createdBy": {"displayName": "Dana Dev", "uniqueName": "dana@contoso.com"},
                "sourceRefName": "refs/heads/feature",
                "targetRefName": "refs/heads/main",
                "reviewers": [
                    {"displayName": "Rae Reviewer", "uniqueName": "rae@contoso.com",
                     "id": "guid-rae", "vote": 10}
                ],
                "lastMergeSourceCommit": {"commitId": "abc123"},
                "creationDate": "2024-01-01T00:00:00Z"
            })
        }

        #[tokio::test]
        async fn test_list_prs_sends_api_version() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests")
                    .query_param("searchCriteria.status", "active")
                    .query_param("api-version", "7.1");
                then.status(200).json_body(serde_json::json!({
                    "count": 1, "value": [pull_json(9)]
                }));
            });

            let provider = create_test_provider(&server);
            let prs = provider.list_prs(PrStateFilter::Open).await.unwrap();

            assert_eq!(prs.len(), 1);
            assert_eq!(prs[0].head_ref, "feature");
            assert_eq!(prs[0].author.as_ref().unwrap().login, "dana@contoso.com");
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_get_review_threads_maps_status() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9/threads");
                then.status(200).json_body(serde_json::json!({
                    "count": 2,
                    "value": [
                        {
                            "id": 100,
                            "status": "fixed",
                            "threadContext": {"filePath": "/src/main.rs",
                                              "rightFileStart": {"line": 4}},
                            "comments": [{"id": 1, "content": "done",
                                          "commentType": "text",
                                          "publishedDate": "2024-01-01T00:00:00Z"}]
                        },
                        {
                            "id": 101,
                            "status": "active",
                            "comments": [{"id": 1, "content": "general",
                                          "commentType": "text",
                                          "publishedDate": "2024-01-01T00:00:00Z"}]
                        }
                    ]
                }));
            });

            let provider = create_test_provider(&server);
            let threads = provider.get_review_threads(9).await.unwrap();

            assert_eq!(threads.len(), 1);
            assert_eq!(threads[0].id, "9:100");
            assert!(threads[0].is_resolved);
            assert_eq!(threads[0].comments[0].database_id, 100_000_001);
        }

        #[tokio::test]
        async fn test_resolve_thread_patches_status() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9/threads/100")
                    .body_includes("\"status\":\"fixed\"");
                then.status(200).json_body(serde_json::json!({"id": 100, "status": "fixed"}));
            });

            let provider = create_test_provider(&server);
            provider.resolve_thread("9:100").await.unwrap();
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_submit_review_approve_casts_vote() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/contoso/_apis/connectionData");
                then.status(200).json_body(serde_json::json!({
                    "authenticatedUser": {"id": "guid-me", "providerDisplayName": "Me"}
                }));
            });
            let vote = server.mock(|when, then| {
                when.method(PUT)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9/reviewers/guid-me")
                    .json_body(serde_json::json!({"vote": 10}));
                then.status(200).json_body(serde_json::json!({"vote": 10}));
            });

            let provider = create_test_provider(&server);
            provider
                .submit_review(9, "", ReviewEvent::Approve)
                .await
                .unwrap();
            vote.assert_hits(1);
        }

        #[tokio::test]
        async fn test_add_diff_comment_sets_right_file_positions() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9/threads")
                    .body_includes("\"rightFileStart\":{\"line\":12}")
                    .body_includes("\"filePath\":\"src/main.rs\"");
                then.status(201).json_body(serde_json::json!({
                    "id": 200,
                    "status": "active",
                    "threadContext": {"filePath": "/src/main.rs",
                                      "rightFileStart": {"line": 12}},
                    "comments": [{"id": 1, "content": "nit",
                                  "commentType": "text",
                                  "publishedDate": "2024-01-01T00:00:00Z"}]
                }));
            });

            let provider = create_test_provider(&server);
            let comment = provider
                .add_diff_comment(
                    9,
                    DiffCommentInput {
                        body: "nit".to_string(),
                        commit_sha: None,
                        path: "src/main.rs".to_string(),
                        line: 12,
                        side: DiffSide::Right,
                    },
                )
                .await
                .unwrap();

            assert_eq!(comment.id, 200_000_001);
            assert_eq!(comment.side, Some(DiffSide::Right));
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_merge_sends_strategy_and_source_commit() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9");
                then.status(200).json_body(pull_json(9));
            });
            let complete = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9")
                    .body_includes("\"mergeStrategy\":\"squash\"")
                    .body_includes("\"commitId\":\"abc123\"");
                then.status(200).json_body(pull_json(9));
            });

            let provider = create_test_provider(&server);
            provider.merge_pr(9, MergeStrategy::Squash).await.unwrap();
            complete.assert_hits(1);
        }

        #[tokio::test]
        async fn test_convert_to_draft_patches_flag() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9")
                    .json_body(serde_json::json!({"isDraft": true}));
                then.status(200).json_body(pull_json(9));
            });

            let provider = create_test_provider(&server);
            provider.convert_to_draft("9").await.unwrap();
            mock.assert_hits(1);

            let err = provider.convert_to_draft("not-a-number").await.unwrap_err();
            assert!(matches!(err, revu_core::ApiError::Azure(_)));
        }

        #[tokio::test]
        async fn test_get_pr_reviews_maps_votes() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/contoso/webapp/_apis/git/repositories/backend/pullRequests/9");
                then.status(200).json_body(pull_json(9));
            });

            let provider = create_test_provider(&server);
            let reviews = provider.get_pr_reviews(9).await.unwrap();
            assert_eq!(reviews.len(), 1);
            assert_eq!(reviews[0].state, "APPROVED");
        }
    }
}
