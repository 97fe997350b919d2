//! GitLab API client implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::warn;

use revu_core::error::{HttpFailure, ProviderKind, Result};
use revu_core::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, Provider, ProviderCapabilities,
    ProviderConfig, PullRequest, Review, ReviewEvent, ReviewThread, ThreadComment, User,
};
use revu_transport::{AuthScheme, CancellationToken, Transport};

use crate::handles::{decode_thread_id, encode_thread_id, parse_draft_handle};
use crate::types::{
    CreateDiscussionRequest, CreateNoteRequest, DiscussionPosition, GitLabApprovals,
    GitLabCommit, GitLabDiff, GitLabDiscussion, GitLabMergeRequest, GitLabNote, GitLabPipeline,
    GitLabUser, MergeBody, ReviewerIdsBody,
};
use crate::DEFAULT_GITLAB_URL;

/// Title prefix marking a merge request as a draft.
const DRAFT_PREFIX: &str = "Draft: ";

/// GitLab provider.
pub struct GitLabProvider {
    project: String,
    transport: Transport,
    capabilities: ProviderCapabilities,
}

impl GitLabProvider {
    /// Create a provider from a repository context.
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a provider whose in-flight calls stop when `cancel` fires.
    pub fn with_cancellation(config: &ProviderConfig, cancel: CancellationToken) -> Self {
        let root = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string());
        let transport = Transport::new(
            ProviderKind::GitLab,
            format!("{}/api/v4", root.trim_end_matches('/')),
            config.token.clone(),
        )
        .with_auth_scheme(AuthScheme::PrivateToken)
        .with_cancellation(cancel);

        Self {
            project: urlencoding::encode(&format!("{}/{}", config.owner, config.repo))
                .into_owned(),
            transport,
            capabilities: ProviderCapabilities {
                draft_prs: true,
                review_threads: true,
                graphql: false,
                reactions: false,
                check_runs: true,
                labels: true,
                merge_strategies: vec![MergeStrategy::Merge, MergeStrategy::Squash],
            },
        }
    }

    /// Shared transport, exposed for rate-limit and token-expiry consumers.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn project_path(&self, endpoint: &str) -> String {
        format!("/projects/{}{}", self.project, endpoint)
    }

    fn mr_path(&self, iid: u64, endpoint: &str) -> String {
        self.project_path(&format!("/merge_requests/{}{}", iid, endpoint))
    }

    async fn get_mr(&self, iid: u64) -> Result<GitLabMergeRequest> {
        self.transport.get_json(&self.mr_path(iid, "")).await
    }

    async fn post_note(&self, iid: u64, body: &str) -> Result<GitLabNote> {
        self.transport
            .mutate_json(
                Method::POST,
                &self.mr_path(iid, "/notes"),
                &CreateNoteRequest { body },
            )
            .await
    }

    async fn fetch_discussions(&self, iid: u64) -> Result<Vec<GitLabDiscussion>> {
        self.transport
            .fetch_paginated(&self.mr_path(iid, "/discussions"))
            .await
    }

    async fn set_title(&self, iid: u64, title: &str) -> Result<()> {
        self.transport
            .mutate_empty(Method::PUT, &self.mr_path(iid, ""), Some(&json!({"title": title})))
            .await
    }

    async fn authored_mrs(&self) -> Result<Vec<GitLabMergeRequest>> {
        self.transport
            .fetch_paginated(&self.project_path("/merge_requests?state=opened&scope=created_by_me"))
            .await
    }

    async fn review_requested_mrs(&self) -> Result<Vec<GitLabMergeRequest>> {
        let me: GitLabUser = self.transport.get_json("/user").await?;
        let path = self.project_path(&format!(
            "/merge_requests?state=opened&scope=all&reviewer_username={}",
            urlencoding::encode(&me.username)
        ));
        self.transport.fetch_paginated(&path).await
    }
}

// =============================================================================
// Mapping functions: GitLab types -> Unified types
// =============================================================================

fn map_user(gl_user: Option<&GitLabUser>) -> Option<User> {
    gl_user.map(|u| User {
        login: u.username.clone(),
        id: Some(u.id),
        name: u.name.clone(),
        avatar_url: u.avatar_url.clone(),
    })
}

fn map_state(state: &str) -> PrState {
    match state {
        "merged" => PrState::Merged,
        "closed" | "locked" => PrState::Closed,
        _ => PrState::Open,
    }
}

/// GitLab reports changes_count as a string like "12" or "20+".
fn parse_changes_count(count: Option<&str>) -> Option<u64> {
    count.and_then(|c| c.trim_end_matches('+').parse().ok())
}

fn map_mr(mr: &GitLabMergeRequest) -> PullRequest {
    PullRequest {
        number: mr.iid,
        title: mr.title.clone(),
        body: mr.description.clone(),
        state: map_state(&mr.state),
        draft: mr.draft || mr.title.starts_with(DRAFT_PREFIX),
        merged: mr.state == "merged",
        author: map_user(mr.author.as_ref()),
        head_ref: mr.source_branch.clone(),
        base_ref: mr.target_branch.clone(),
        labels: mr.labels.clone(),
        additions: None,
        deletions: None,
        changed_files: parse_changes_count(mr.changes_count.as_deref()),
        url: mr.web_url.clone(),
        created_at: mr.created_at.clone(),
        updated_at: mr.updated_at.clone(),
    }
}

fn map_note_comment(note: &GitLabNote, in_reply_to: Option<i64>) -> Comment {
    let position = note.position.as_ref();
    let side = position.map(|p| {
        if p.new_line.is_some() {
            DiffSide::Right
        } else {
            DiffSide::Left
        }
    });
    Comment {
        id: note.id,
        body: note.body.clone(),
        author: map_user(note.author.as_ref()),
        path: position.and_then(|p| p.new_path.clone().or_else(|| p.old_path.clone())),
        line: position.and_then(|p| p.new_line.or(p.old_line)),
        side,
        in_reply_to,
        created_at: note.created_at.clone(),
        updated_at: note.updated_at.clone(),
    }
}

fn map_issue_note(note: &GitLabNote) -> IssueComment {
    IssueComment {
        id: note.id,
        body: note.body.clone(),
        author: map_user(note.author.as_ref()),
        created_at: note.created_at.clone(),
        updated_at: note.updated_at.clone(),
    }
}

/// Per-file counts are not part of GitLab's diff payload; derive them from
/// the unified diff text.
fn count_diff_lines(diff: &str) -> (u64, u64) {
    let mut additions = 0;
    let mut deletions = 0;
    for line in diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            additions += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            deletions += 1;
        }
    }
    (additions, deletions)
}

fn map_diff(diff: &GitLabDiff) -> FileChange {
    let status = if diff.new_file {
        "added"
    } else if diff.deleted_file {
        "removed"
    } else if diff.renamed_file {
        "renamed"
    } else {
        "modified"
    };
    let (additions, deletions) = count_diff_lines(&diff.diff);
    FileChange {
        path: diff.new_path.clone(),
        previous_path: diff.renamed_file.then(|| diff.old_path.clone()),
        status: status.to_string(),
        additions,
        deletions,
        patch: (!diff.diff.is_empty()).then(|| diff.diff.clone()),
    }
}

fn map_commit(commit: &GitLabCommit) -> Commit {
    Commit {
        sha: commit.id.clone(),
        message: commit.message.clone(),
        author_login: commit.author_name.clone(),
        authored_at: commit.authored_date.clone(),
    }
}

fn map_pipeline(pipeline: &GitLabPipeline) -> CheckRun {
    let terminal = matches!(
        pipeline.status.as_str(),
        "success" | "failed" | "canceled" | "skipped"
    );
    CheckRun {
        name: format!("pipeline #{}", pipeline.id),
        status: if terminal {
            "completed".to_string()
        } else {
            pipeline.status.clone()
        },
        conclusion: terminal.then(|| pipeline.status.clone()),
        url: pipeline.web_url.clone(),
    }
}

/// A discussion is resolved when every resolvable note in it is resolved.
/// A discussion with no resolvable notes is never "resolved".
fn discussion_resolved(discussion: &GitLabDiscussion) -> bool {
    let mut any_resolvable = false;
    for note in &discussion.notes {
        if note.resolvable {
            any_resolvable = true;
            if note.resolved != Some(true) {
                return false;
            }
        }
    }
    any_resolvable
}

fn state_param(filter: PrStateFilter) -> &'static str {
    match filter {
        PrStateFilter::Open => "opened",
        PrStateFilter::Closed => "closed",
        PrStateFilter::All => "all",
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl Provider for GitLabProvider {
    fn name(&self) -> &str {
        "gitlab"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>> {
        let path = self.project_path(&format!("/merge_requests?state={}", state_param(state)));
        let mrs: Vec<GitLabMergeRequest> = self.transport.fetch_paginated(&path).await?;
        Ok(mrs.iter().map(map_mr).collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        Ok(map_mr(&self.get_mr(number).await?))
    }

    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let diffs: Vec<GitLabDiff> = self
            .transport
            .fetch_paginated(&self.mr_path(number, "/diffs"))
            .await?;
        Ok(diffs.iter().map(map_diff).collect())
    }

    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let discussions = self.fetch_discussions(number).await?;
        let mut comments = Vec::new();
        for discussion in &discussions {
            let mut root: Option<i64> = None;
            for note in &discussion.notes {
                if note.system || note.position.is_none() {
                    continue;
                }
                comments.push(map_note_comment(note, root));
                if root.is_none() {
                    root = Some(note.id);
                }
            }
        }
        Ok(comments)
    }

    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>> {
        let notes: Vec<GitLabNote> = self
            .transport
            .fetch_paginated(&self.mr_path(number, "/notes"))
            .await?;
        Ok(notes
            .iter()
            .filter(|n| !n.system && n.position.is_none())
            .map(map_issue_note)
            .collect())
    }

    /// GitLab has no discrete review objects; approvals are the closest
    /// analogue and map to APPROVED reviews.
    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>> {
        let approvals: GitLabApprovals = self
            .transport
            .get_json(&self.mr_path(number, "/approvals"))
            .await?;
        Ok(approvals
            .approved_by
            .iter()
            .map(|a| Review {
                id: a.user.id,
                author: map_user(Some(&a.user)),
                state: "APPROVED".to_string(),
                body: None,
                submitted_at: None,
            })
            .collect())
    }

    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>> {
        let commits: Vec<GitLabCommit> = self
            .transport
            .fetch_paginated(&self.mr_path(number, "/commits"))
            .await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>> {
        let pipelines: Vec<GitLabPipeline> = self
            .transport
            .fetch_paginated(&self.mr_path(number, "/pipelines"))
            .await?;
        Ok(pipelines.iter().map(map_pipeline).collect())
    }

    async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>> {
        let discussions = self.fetch_discussions(number).await?;
        Ok(discussions
            .iter()
            .filter(|d| d.notes.iter().any(|n| n.position.is_some()))
            .map(|d| ReviewThread {
                id: encode_thread_id(number, &d.id),
                is_resolved: discussion_resolved(d),
                comments: d
                    .notes
                    .iter()
                    .filter(|n| !n.system)
                    .map(|n| ThreadComment { database_id: n.id })
                    .collect(),
            })
            .collect())
    }

    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>> {
        let path = self.project_path(&format!("/repository/commits/{}/diff", sha));
        let diffs: Vec<GitLabDiff> = self.transport.fetch_paginated(&path).await?;
        Ok(diffs.iter().map(map_diff).collect())
    }

    async fn get_my_prs(&self) -> Result<Vec<PullRequest>> {
        Ok(self.authored_mrs().await?.iter().map(map_mr).collect())
    }

    async fn get_review_requests(&self) -> Result<Vec<PullRequest>> {
        Ok(self
            .review_requested_mrs()
            .await?
            .iter()
            .map(map_mr)
            .collect())
    }

    /// Authored plus review-requested, de-duplicated by iid. GitLab has no
    /// single "involves" scope.
    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>> {
        let mut mrs = self.authored_mrs().await?;
        for mr in self.review_requested_mrs().await? {
            if !mrs.iter().any(|m| m.iid == mr.iid) {
                mrs.push(mr);
            }
        }
        Ok(mrs.iter().map(map_mr).collect())
    }

    /// GitLab has no review object, so the verdict is translated:
    /// APPROVE hits the approve endpoint (plus a note when a body is given),
    /// REQUEST_CHANGES and COMMENT become notes. Approve-with-body issues two
    /// independent HTTP calls; the second may fail after the first succeeded.
    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()> {
        match event {
            ReviewEvent::Approve => {
                self.transport
                    .mutate_empty::<()>(Method::POST, &self.mr_path(number, "/approve"), None)
                    .await?;
                if !body.is_empty() {
                    self.post_note(number, body).await?;
                }
            }
            ReviewEvent::RequestChanges => {
                // GitLab rejects empty note bodies.
                let text = if body.is_empty() {
                    "Changes requested."
                } else {
                    body
                };
                self.post_note(number, text).await?;
            }
            ReviewEvent::Comment => {
                self.post_note(number, body).await?;
            }
        }
        Ok(())
    }

    /// No pending-review primitive; the dummy id lets GitHub-shaped calling
    /// code run unchanged.
    async fn create_pending_review(&self, _number: u64) -> Result<PendingReview> {
        Ok(PendingReview {
            id: "0".to_string(),
        })
    }

    /// Comments post immediately since nothing can be staged.
    async fn add_pending_review_comment(
        &self,
        number: u64,
        _review_id: &str,
        input: DiffCommentInput,
    ) -> Result<()> {
        self.add_diff_comment(number, input).await?;
        Ok(())
    }

    async fn submit_pending_review(
        &self,
        number: u64,
        _review_id: &str,
        body: &str,
        event: ReviewEvent,
    ) -> Result<()> {
        self.submit_review(number, body, event).await
    }

    /// Nothing was staged, so there is nothing to discard.
    async fn discard_pending_review(&self, _number: u64, _review_id: &str) -> Result<()> {
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<IssueComment> {
        let note = self.post_note(number, body).await?;
        Ok(map_issue_note(&note))
    }

    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment> {
        let mr = self.get_mr(number).await?;
        let refs = mr.diff_refs.ok_or_else(|| {
            ProviderKind::GitLab.error(HttpFailure::message(
                "merge request carries no diff refs; cannot anchor a comment",
            ))
        })?;

        let head_sha = input.commit_sha.as_deref().unwrap_or(&refs.head_sha);
        let (new_line, old_line) = match input.side {
            DiffSide::Right => (Some(input.line), None),
            DiffSide::Left => (None, Some(input.line)),
        };
        let request = CreateDiscussionRequest {
            body: &input.body,
            position: DiscussionPosition {
                position_type: "text",
                base_sha: &refs.base_sha,
                head_sha,
                start_sha: &refs.start_sha,
                new_path: &input.path,
                old_path: &input.path,
                new_line,
                old_line,
            },
        };

        let discussion: GitLabDiscussion = self
            .transport
            .mutate_json(Method::POST, &self.mr_path(number, "/discussions"), &request)
            .await?;
        discussion
            .notes
            .first()
            .map(|n| map_note_comment(n, None))
            .ok_or_else(|| {
                ProviderKind::GitLab
                    .error(HttpFailure::message("created discussion contains no note"))
            })
    }

    /// Replies are per-discussion; the discussion is located by scanning the
    /// MR's discussions for the note being replied to.
    async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let discussions = self.fetch_discussions(number).await?;
        let discussion = discussions
            .iter()
            .find(|d| d.notes.iter().any(|n| n.id == comment_id))
            .ok_or_else(|| {
                ProviderKind::GitLab.error(HttpFailure::message(format!(
                    "comment {} belongs to no discussion on merge request {}",
                    comment_id, number
                )))
            })?;

        let path = self.mr_path(
            number,
            &format!("/discussions/{}/notes", urlencoding::encode(&discussion.id)),
        );
        let note: GitLabNote = self
            .transport
            .mutate_json(Method::POST, &path, &CreateNoteRequest { body })
            .await?;
        Ok(map_note_comment(&note, Some(comment_id)))
    }

    async fn update_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let path = self.mr_path(number, &format!("/notes/{}", comment_id));
        let note: GitLabNote = self
            .transport
            .mutate_json(Method::PUT, &path, &CreateNoteRequest { body })
            .await?;
        Ok(map_note_comment(&note, None))
    }

    async fn delete_comment(&self, number: u64, comment_id: i64) -> Result<()> {
        let path = self.mr_path(number, &format!("/notes/{}", comment_id));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        let squash = match strategy {
            MergeStrategy::Merge => false,
            MergeStrategy::Squash => true,
            MergeStrategy::Rebase => {
                return Err(ProviderKind::GitLab.error(HttpFailure::message(
                    "rebase merges are not supported on GitLab",
                )));
            }
        };
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, "/merge"),
                Some(&MergeBody { squash }),
            )
            .await
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&json!({"state_event": "close"})),
            )
            .await
    }

    async fn reopen_pr(&self, number: u64) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&json!({"state_event": "reopen"})),
            )
            .await
    }

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()> {
        self.set_title(number, title).await
    }

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&json!({"description": body})),
            )
            .await
    }

    /// GitLab assigns reviewers by numeric user id. Non-numeric entries are
    /// dropped; an input that leaves no valid ids is an error, not an empty
    /// assignment.
    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()> {
        let reviewer_ids: Vec<u64> = reviewers
            .iter()
            .filter_map(|r| match r.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(reviewer = %r, "skipping non-numeric reviewer id");
                    None
                }
            })
            .collect();

        if reviewer_ids.is_empty() {
            return Err(ProviderKind::GitLab.error(HttpFailure::message(
                "no numeric reviewer ids in request; GitLab requires user ids",
            )));
        }

        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&ReviewerIdsBody { reviewer_ids }),
            )
            .await
    }

    async fn resolve_thread(&self, thread_id: &str) -> Result<()> {
        let (iid, discussion_id) = decode_thread_id(thread_id);
        let path = self.mr_path(
            iid,
            &format!(
                "/discussions/{}?resolved=true",
                urlencoding::encode(&discussion_id)
            ),
        );
        self.transport
            .mutate_empty::<()>(Method::PUT, &path, None)
            .await
    }

    async fn unresolve_thread(&self, thread_id: &str) -> Result<()> {
        let (iid, discussion_id) = decode_thread_id(thread_id);
        let path = self.mr_path(
            iid,
            &format!(
                "/discussions/{}?resolved=false",
                urlencoding::encode(&discussion_id)
            ),
        );
        self.transport
            .mutate_empty::<()>(Method::PUT, &path, None)
            .await
    }

    /// Draft status lives in the title. The handle carries both the iid and
    /// the current title so no extra fetch is needed.
    async fn convert_to_draft(&self, handle: &str) -> Result<()> {
        let (iid, title) = parse_draft_handle(handle)?;
        if title.starts_with(DRAFT_PREFIX) {
            return Ok(());
        }
        self.set_title(iid, &format!("{}{}", DRAFT_PREFIX, title))
            .await
    }

    async fn mark_ready_for_review(&self, handle: &str) -> Result<()> {
        let (iid, title) = parse_draft_handle(handle)?;
        match title.strip_prefix(DRAFT_PREFIX) {
            Some(stripped) => self.set_title(iid, stripped).await,
            None => Ok(()),
        }
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&json!({"add_labels": labels.join(",")})),
            )
            .await
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.mr_path(number, ""),
                Some(&json!({"remove_labels": label})),
            )
            .await
    }

    async fn get_current_user(&self) -> Result<User> {
        let user: GitLabUser = self.transport.get_json("/user").await?;
        Ok(User {
            login: user.username,
            id: Some(user.id),
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }
}
