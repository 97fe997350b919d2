//! Bitbucket Cloud API client implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;

use revu_core::error::{ApiError, HttpFailure, ProviderKind, Result};
use revu_core::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, Provider, ProviderCapabilities,
    ProviderConfig, PullRequest, Review, ReviewEvent, ReviewThread, ThreadComment, User,
};
use revu_transport::{CancellationToken, Transport, MAX_PAGES};

use crate::types::{
    BitbucketComment, BitbucketCommit, BitbucketDiffStat, BitbucketPage, BitbucketPull,
    BitbucketStatus, BitbucketUser, ContentBody, CreateCommentRequest, InlineBody, MergeRequestBody,
    ParentBody,
};
use crate::DEFAULT_BITBUCKET_URL;

/// Bitbucket Cloud provider.
pub struct BitbucketProvider {
    workspace: String,
    repo: String,
    transport: Transport,
    capabilities: ProviderCapabilities,
}

impl BitbucketProvider {
    /// Create a provider from a repository context.
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a provider whose in-flight calls stop when `cancel` fires.
    pub fn with_cancellation(config: &ProviderConfig, cancel: CancellationToken) -> Self {
        let base = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BITBUCKET_URL.to_string());
        let transport = Transport::new(ProviderKind::Bitbucket, base, config.token.clone())
            .with_cancellation(cancel);

        Self {
            workspace: config.owner.clone(),
            repo: config.repo.clone(),
            transport,
            capabilities: ProviderCapabilities {
                draft_prs: false,
                review_threads: false,
                graphql: false,
                reactions: false,
                check_runs: true,
                labels: false,
                merge_strategies: vec![MergeStrategy::Merge, MergeStrategy::Squash],
            },
        }
    }

    /// Shared transport, exposed for rate-limit and token-expiry consumers.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn repo_path(&self, endpoint: &str) -> String {
        format!("/repositories/{}/{}{}", self.workspace, self.repo, endpoint)
    }

    fn unsupported(&self, what: &str) -> ApiError {
        ProviderKind::Bitbucket.error(HttpFailure::message(format!(
            "{} is not supported on Bitbucket",
            what
        )))
    }

    /// Follow body `next` URLs, concatenating `values`, with the same page
    /// cap as Link-header pagination.
    async fn fetch_values<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut next = Some(with_default_pagelen(path));
        let mut items = Vec::new();
        let mut pages = 0;

        while let Some(target) = next {
            if pages >= MAX_PAGES {
                break;
            }
            let page: BitbucketPage<T> = self.transport.get_json(&target).await?;
            items.extend(page.values);
            pages += 1;
            next = page.next;
        }

        Ok(items)
    }

    async fn fetch_comments(&self, number: u64) -> Result<Vec<BitbucketComment>> {
        let comments: Vec<BitbucketComment> = self
            .fetch_values(&self.repo_path(&format!("/pullrequests/{}/comments", number)))
            .await?;
        Ok(comments.into_iter().filter(|c| !c.deleted).collect())
    }

    async fn current_user(&self) -> Result<BitbucketUser> {
        self.transport.get_json("/user").await
    }

    async fn query_prs(&self, filter: &str) -> Result<Vec<PullRequest>> {
        let path = self.repo_path(&format!(
            "/pullrequests?q={}",
            urlencoding::encode(filter)
        ));
        let pulls: Vec<BitbucketPull> = self.fetch_values(&path).await?;
        Ok(pulls.iter().map(map_pull).collect())
    }

    async fn post_comment(&self, number: u64, request: &CreateCommentRequest<'_>) -> Result<BitbucketComment> {
        self.transport
            .mutate_json(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{}/comments", number)),
                request,
            )
            .await
    }
}

fn with_default_pagelen(path: &str) -> String {
    if path.contains("pagelen=") {
        return path.to_string();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}pagelen=50", path, separator)
}

// =============================================================================
// Mapping functions: Bitbucket types -> Unified types
// =============================================================================

fn map_user(bb_user: Option<&BitbucketUser>) -> Option<User> {
    bb_user.map(|u| User {
        login: u
            .nickname
            .clone()
            .or_else(|| u.username.clone())
            .or_else(|| u.display_name.clone())
            .unwrap_or_default(),
        id: None,
        name: u.display_name.clone(),
        avatar_url: u
            .links
            .as_ref()
            .and_then(|l| l.avatar.as_ref())
            .map(|a| a.href.clone()),
    })
}

fn map_state(state: &str) -> PrState {
    match state {
        "MERGED" => PrState::Merged,
        "DECLINED" | "SUPERSEDED" => PrState::Closed,
        _ => PrState::Open,
    }
}

fn map_pull(pull: &BitbucketPull) -> PullRequest {
    PullRequest {
        number: pull.id,
        title: pull.title.clone(),
        body: pull.description.clone().filter(|d| !d.is_empty()),
        state: map_state(&pull.state),
        draft: false,
        merged: pull.state == "MERGED",
        author: map_user(pull.author.as_ref()),
        head_ref: pull.source.branch.name.clone(),
        base_ref: pull.destination.branch.name.clone(),
        labels: vec![],
        additions: None,
        deletions: None,
        changed_files: None,
        url: pull
            .links
            .html
            .as_ref()
            .map(|l| l.href.clone())
            .unwrap_or_default(),
        created_at: pull.created_on.clone(),
        updated_at: pull.updated_on.clone(),
    }
}

fn map_comment(comment: &BitbucketComment) -> Comment {
    let inline = comment.inline.as_ref();
    Comment {
        id: comment.id,
        body: comment.content.raw.clone(),
        author: map_user(comment.user.as_ref()),
        path: inline.map(|i| i.path.clone()),
        line: inline.and_then(|i| i.to.or(i.from)),
        side: inline.map(|i| {
            if i.to.is_some() {
                DiffSide::Right
            } else {
                DiffSide::Left
            }
        }),
        in_reply_to: comment.parent.as_ref().map(|p| p.id),
        created_at: comment.created_on.clone(),
        updated_at: comment.updated_on.clone(),
    }
}

fn map_issue_comment(comment: &BitbucketComment) -> IssueComment {
    IssueComment {
        id: comment.id,
        body: comment.content.raw.clone(),
        author: map_user(comment.user.as_ref()),
        created_at: comment.created_on.clone(),
        updated_at: comment.updated_on.clone(),
    }
}

fn map_diffstat(stat: &BitbucketDiffStat) -> FileChange {
    FileChange {
        path: stat
            .new
            .as_ref()
            .or(stat.old.as_ref())
            .map(|p| p.path.clone())
            .unwrap_or_default(),
        previous_path: (stat.status == "renamed")
            .then(|| stat.old.as_ref().map(|p| p.path.clone()))
            .flatten(),
        status: stat.status.clone(),
        additions: stat.lines_added,
        deletions: stat.lines_removed,
        patch: None,
    }
}

fn map_commit(commit: &BitbucketCommit) -> Commit {
    Commit {
        sha: commit.hash.clone(),
        message: commit.message.clone(),
        author_login: commit
            .author
            .as_ref()
            .and_then(|a| map_user(a.user.as_ref()))
            .map(|u| u.login),
        authored_at: commit.date.clone(),
    }
}

fn map_status(status: &BitbucketStatus) -> CheckRun {
    let terminal = matches!(status.state.as_str(), "SUCCESSFUL" | "FAILED" | "STOPPED");
    CheckRun {
        name: status
            .name
            .clone()
            .or_else(|| status.key.clone())
            .unwrap_or_default(),
        status: if terminal {
            "completed".to_string()
        } else {
            "in_progress".to_string()
        },
        conclusion: terminal.then(|| status.state.to_lowercase()),
        url: status.url.clone(),
    }
}

/// Group inline comments into threads rooted at their topmost ancestor.
fn group_threads(comments: &[BitbucketComment]) -> Vec<ReviewThread> {
    let inline: Vec<&BitbucketComment> =
        comments.iter().filter(|c| c.inline.is_some()).collect();
    let parents: HashMap<i64, i64> = inline
        .iter()
        .filter_map(|c| c.parent.as_ref().map(|p| (c.id, p.id)))
        .collect();

    let root_of = |mut id: i64| {
        while let Some(&parent) = parents.get(&id) {
            id = parent;
        }
        id
    };

    let mut threads: Vec<ReviewThread> = Vec::new();
    for comment in &inline {
        let root = root_of(comment.id).to_string();
        let index = match threads.iter().position(|t| t.id == root) {
            Some(index) => index,
            None => {
                threads.push(ReviewThread {
                    id: root,
                    // Bitbucket has no thread resolution.
                    is_resolved: false,
                    comments: vec![],
                });
                threads.len() - 1
            }
        };
        threads[index].comments.push(ThreadComment {
            database_id: comment.id,
        });
    }
    threads
}

fn map_participant_review(participant: &crate::types::BitbucketParticipant) -> Option<Review> {
    let state = participant.state.as_deref()?;
    let user = map_user(participant.user.as_ref());
    Some(Review {
        id: 0,
        author: user,
        state: match state {
            "approved" => "APPROVED".to_string(),
            "changes_requested" => "CHANGES_REQUESTED".to_string(),
            other => other.to_uppercase(),
        },
        body: None,
        submitted_at: participant.participated_on.clone(),
    })
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl Provider for BitbucketProvider {
    fn name(&self) -> &str {
        "bitbucket"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn list_prs(&self, state: PrStateFilter) -> Result<Vec<PullRequest>> {
        let query = match state {
            PrStateFilter::Open => "?state=OPEN",
            PrStateFilter::Closed => "?state=MERGED&state=DECLINED",
            PrStateFilter::All => "?state=OPEN&state=MERGED&state=DECLINED",
        };
        let pulls: Vec<BitbucketPull> = self
            .fetch_values(&self.repo_path(&format!("/pullrequests{}", query)))
            .await?;
        Ok(pulls.iter().map(map_pull).collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        let pull: BitbucketPull = self
            .transport
            .get_json(&self.repo_path(&format!("/pullrequests/{}", number)))
            .await?;
        Ok(map_pull(&pull))
    }

    async fn get_pr_files(&self, number: u64) -> Result<Vec<FileChange>> {
        let stats: Vec<BitbucketDiffStat> = self
            .fetch_values(&self.repo_path(&format!("/pullrequests/{}/diffstat", number)))
            .await?;
        Ok(stats.iter().map(map_diffstat).collect())
    }

    async fn get_pr_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let comments = self.fetch_comments(number).await?;
        Ok(comments
            .iter()
            .filter(|c| c.inline.is_some())
            .map(map_comment)
            .collect())
    }

    async fn get_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>> {
        let comments = self.fetch_comments(number).await?;
        Ok(comments
            .iter()
            .filter(|c| c.inline.is_none())
            .map(map_issue_comment)
            .collect())
    }

    /// Bitbucket has no review objects; participant verdicts are the
    /// closest analogue.
    async fn get_pr_reviews(&self, number: u64) -> Result<Vec<Review>> {
        let pull: BitbucketPull = self
            .transport
            .get_json(&self.repo_path(&format!("/pullrequests/{}", number)))
            .await?;
        Ok(pull
            .participants
            .iter()
            .filter_map(map_participant_review)
            .collect())
    }

    async fn get_pr_commits(&self, number: u64) -> Result<Vec<Commit>> {
        let commits: Vec<BitbucketCommit> = self
            .fetch_values(&self.repo_path(&format!("/pullrequests/{}/commits", number)))
            .await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn get_pr_checks(&self, number: u64) -> Result<Vec<CheckRun>> {
        let statuses: Vec<BitbucketStatus> = self
            .fetch_values(&self.repo_path(&format!("/pullrequests/{}/statuses", number)))
            .await?;
        Ok(statuses.iter().map(map_status).collect())
    }

    /// Inline comments group into threads by parent chain, but Bitbucket
    /// has no resolution state; every thread reports unresolved.
    async fn get_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>> {
        let comments = self.fetch_comments(number).await?;
        Ok(group_threads(&comments))
    }

    async fn get_commit_diff(&self, sha: &str) -> Result<Vec<FileChange>> {
        let stats: Vec<BitbucketDiffStat> = self
            .fetch_values(&self.repo_path(&format!("/diffstat/{}", sha)))
            .await?;
        Ok(stats.iter().map(map_diffstat).collect())
    }

    async fn get_my_prs(&self) -> Result<Vec<PullRequest>> {
        let me = self.current_user().await?;
        let uuid = me.uuid.unwrap_or_default();
        self.query_prs(&format!(r#"state="OPEN" AND author.uuid="{}""#, uuid))
            .await
    }

    async fn get_review_requests(&self) -> Result<Vec<PullRequest>> {
        let me = self.current_user().await?;
        let uuid = me.uuid.unwrap_or_default();
        self.query_prs(&format!(r#"state="OPEN" AND reviewers.uuid="{}""#, uuid))
            .await
    }

    async fn get_involved_prs(&self) -> Result<Vec<PullRequest>> {
        let me = self.current_user().await?;
        let uuid = me.uuid.unwrap_or_default();
        let mut prs = self
            .query_prs(&format!(r#"state="OPEN" AND author.uuid="{}""#, uuid))
            .await?;
        for pr in self
            .query_prs(&format!(r#"state="OPEN" AND reviewers.uuid="{}""#, uuid))
            .await?
        {
            if !prs.iter().any(|p| p.number == pr.number) {
                prs.push(pr);
            }
        }
        Ok(prs)
    }

    /// Approve and request-changes are dedicated endpoints; a non-empty body
    /// becomes a separate comment, so this can issue two HTTP calls.
    async fn submit_review(&self, number: u64, body: &str, event: ReviewEvent) -> Result<()> {
        match event {
            ReviewEvent::Approve => {
                self.transport
                    .mutate_empty::<()>(
                        Method::POST,
                        &self.repo_path(&format!("/pullrequests/{}/approve", number)),
                        None,
                    )
                    .await?;
            }
            ReviewEvent::RequestChanges => {
                self.transport
                    .mutate_empty::<()>(
                        Method::POST,
                        &self.repo_path(&format!("/pullrequests/{}/request-changes", number)),
                        None,
                    )
                    .await?;
            }
            ReviewEvent::Comment => {}
        }
        if !body.is_empty() || matches!(event, ReviewEvent::Comment) {
            self.add_comment(number, body).await?;
        }
        Ok(())
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
        let comment = self
            .post_comment(
                number,
                &CreateCommentRequest {
                    content: ContentBody { raw: body },
                    inline: None,
                    parent: None,
                },
            )
            .await?;
        Ok(map_issue_comment(&comment))
    }

    async fn add_diff_comment(&self, number: u64, input: DiffCommentInput) -> Result<Comment> {
        let (to, from) = match input.side {
            DiffSide::Right => (Some(input.line), None),
            DiffSide::Left => (None, Some(input.line)),
        };
        let comment = self
            .post_comment(
                number,
                &CreateCommentRequest {
                    content: ContentBody { raw: &input.body },
                    inline: Some(InlineBody {
                        path: &input.path,
                        to,
                        from,
                    }),
                    parent: None,
                },
            )
            .await?;
        Ok(map_comment(&comment))
    }

    async fn reply_to_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let comment = self
            .post_comment(
                number,
                &CreateCommentRequest {
                    content: ContentBody { raw: body },
                    inline: None,
                    parent: Some(ParentBody { id: comment_id }),
                },
            )
            .await?;
        Ok(map_comment(&comment))
    }

    async fn update_comment(&self, number: u64, comment_id: i64, body: &str) -> Result<Comment> {
        let path = self.repo_path(&format!("/pullrequests/{}/comments/{}", number, comment_id));
        let comment: BitbucketComment = self
            .transport
            .mutate_json(
                Method::PUT,
                &path,
                &json!({"content": {"raw": body}}),
            )
            .await?;
        Ok(map_comment(&comment))
    }

    async fn delete_comment(&self, number: u64, comment_id: i64) -> Result<()> {
        let path = self.repo_path(&format!("/pullrequests/{}/comments/{}", number, comment_id));
        self.transport
            .mutate_empty::<()>(Method::DELETE, &path, None)
            .await
    }

    async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        let merge_strategy = match strategy {
            MergeStrategy::Merge => "merge_commit",
            MergeStrategy::Squash => "squash",
            MergeStrategy::Rebase => {
                return Err(self.unsupported("rebase merges"));
            }
        };
        self.transport
            .mutate_empty(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{}/merge", number)),
                Some(&MergeRequestBody { merge_strategy }),
            )
            .await
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        self.transport
            .mutate_empty::<()>(
                Method::POST,
                &self.repo_path(&format!("/pullrequests/{}/decline", number)),
                None,
            )
            .await
    }

    async fn reopen_pr(&self, _number: u64) -> Result<()> {
        Err(self.unsupported("reopening a declined pull request"))
    }

    async fn update_pr_title(&self, number: u64, title: &str) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.repo_path(&format!("/pullrequests/{}", number)),
                Some(&json!({"title": title})),
            )
            .await
    }

    async fn update_pr_body(&self, number: u64, body: &str) -> Result<()> {
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.repo_path(&format!("/pullrequests/{}", number)),
                Some(&json!({"description": body})),
            )
            .await
    }

    /// Reviewers are addressed by account UUID on Bitbucket.
    async fn request_re_review(&self, number: u64, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Err(ProviderKind::Bitbucket
                .error(HttpFailure::message("no reviewers given to re-request")));
        }
        let entries: Vec<serde_json::Value> =
            reviewers.iter().map(|r| json!({"uuid": r})).collect();
        self.transport
            .mutate_empty(
                Method::PUT,
                &self.repo_path(&format!("/pullrequests/{}", number)),
                Some(&json!({"reviewers": entries})),
            )
            .await
    }

    async fn resolve_thread(&self, _thread_id: &str) -> Result<()> {
        Err(self.unsupported("thread resolution"))
    }

    async fn unresolve_thread(&self, _thread_id: &str) -> Result<()> {
        Err(self.unsupported("thread resolution"))
    }

    async fn convert_to_draft(&self, _handle: &str) -> Result<()> {
        Err(self.unsupported("draft pull requests"))
    }

    async fn mark_ready_for_review(&self, _handle: &str) -> Result<()> {
        Err(self.unsupported("draft pull requests"))
    }

    async fn add_labels(&self, _number: u64, _labels: &[String]) -> Result<()> {
        Err(self.unsupported("labels"))
    }

    async fn remove_label(&self, _number: u64, _label: &str) -> Result<()> {
        Err(self.unsupported("labels"))
    }

    async fn get_current_user(&self) -> Result<User> {
        let user = self.current_user().await?;
        Ok(map_user(Some(&user)).unwrap_or(User {
            login: String::new(),
            id: None,
            name: None,
            avatar_url: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_json(id: i64, parent: Option<i64>, inline: bool) -> serde_json::Value {
        let mut value = serde_json::json!({
            "id": id,
            "content": {"raw": format!("comment {}", id)},
            "user": {"nickname": "reviewer", "display_name": "A Reviewer"},
            "created_on": "2024-01-01T00:00:00Z"
        });
        if let Some(parent) = parent {
            value["parent"] = serde_json::json!({"id": parent});
        }
        if inline {
            value["inline"] = serde_json::json!({"path": "src/lib.rs", "to": 4});
        }
        value
    }

    #[test]
    fn test_map_user_login_fallbacks() {
        let nick: BitbucketUser = serde_json::from_value(serde_json::json!({
            "nickname": "nick", "display_name": "Nick Name"
        }))
        .unwrap();
        assert_eq!(map_user(Some(&nick)).unwrap().login, "nick");

        let display_only: BitbucketUser =
            serde_json::from_value(serde_json::json!({"display_name": "Display Only"})).unwrap();
        assert_eq!(map_user(Some(&display_only)).unwrap().login, "Display Only");
    }

    #[test]
    fn test_map_state() {
        assert_eq!(map_state("OPEN"), PrState::Open);
        assert_eq!(map_state("MERGED"), PrState::Merged);
        assert_eq!(map_state("DECLINED"), PrState::Closed);
        assert_eq!(map_state("SUPERSEDED"), PrState::Closed);
    }

    #[test]
    fn test_group_threads_follows_parent_chain() {
        let comments: Vec<BitbucketComment> = serde_json::from_value(serde_json::json!([
            comment_json(1, None, true),
            comment_json(2, Some(1), true),
            comment_json(3, Some(2), true),
            comment_json(4, None, true),
            comment_json(5, None, false),
        ]))
        .unwrap();

        let threads = group_threads(&comments);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, "1");
        assert_eq!(threads[0].comments.len(), 3);
        assert_eq!(threads[1].id, "4");
        assert!(!threads[0].is_resolved);
    }

    #[test]
    fn test_with_default_pagelen() {
        assert_eq!(with_default_pagelen("/x"), "/x?pagelen=50");
        assert_eq!(with_default_pagelen("/x?state=OPEN"), "/x?state=OPEN&pagelen=50");
        assert_eq!(with_default_pagelen("/x?pagelen=10"), "/x?pagelen=10");
    }

    #[test]
    fn test_map_status() {
        let status: BitbucketStatus = serde_json::from_value(serde_json::json!({
            "key": "ci", "name": "pipeline", "state": "SUCCESSFUL",
            "url": "https://ci.example/1"
        }))
        .unwrap();
        let check = map_status(&status);
        assert_eq!(check.status, "completed");
        assert_eq!(check.conclusion.as_deref(), Some("successful"));

        let running: BitbucketStatus =
            serde_json::from_value(serde_json::json!({"state": "INPROGRESS"})).unwrap();
        assert_eq!(map_status(&running).conclusion, None);
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_provider(server: &MockServer) -> BitbucketProvider {
            BitbucketProvider::new(&ProviderConfig {
                kind: ProviderKind::Bitbucket,
                base_url: Some(server.base_url()),
                token: "bb-token".to_string(),
                owner: "acme".to_string(),
                repo: "widget".to_string(),
            })
        }

        fn pull_json(id: u64) -> serde_json::Value {
            serde_json::json!({
                "id": id,
                "title": format!("PR {}", id),
                "state": "OPEN",
                "author": {"nickname": "octocat", "display_name": "Octo Cat"},
                "source": {"branch": {"name": "feature"}},
                "destination": {"branch": {"name": "main"}},
                "links": {"html": {"href": format!("https://bitbucket.org/acme/widget/pull-requests/{}", id)}},
                "created_on": "2024-01-01T00:00:00Z",
                "updated_on": "2024-01-02T00:00:00Z"
            })
        }

        #[tokio::test]
        async fn test_list_prs_follows_body_next_url() {
            let server = MockServer::start();
            let page1 = server.mock(|when, then| {
                when.method(GET)
                    .path("/repositories/acme/widget/pullrequests")
                    .query_param("state", "OPEN")
                    .query_param("pagelen", "50")
                    .header("authorization", "Bearer bb-token");
                then.status(200).json_body(serde_json::json!({
                    "values": [pull_json(1)],
                    "next": format!("{}/pullrequests-page2", server.base_url())
                }));
            });
            let page2 = server.mock(|when, then| {
                when.method(GET).path("/pullrequests-page2");
                then.status(200).json_body(serde_json::json!({
                    "values": [pull_json(2)]
                }));
            });

            let provider = create_test_provider(&server);
            let prs = provider.list_prs(PrStateFilter::Open).await.unwrap();

            assert_eq!(prs.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2]);
            page1.assert_hits(1);
            page2.assert_hits(1);
        }

        #[tokio::test]
        async fn test_approve_with_body_issues_two_calls() {
            let server = MockServer::start();
            let approve = server.mock(|when, then| {
                when.method(POST)
                    .path("/repositories/acme/widget/pullrequests/7/approve");
                then.status(200).json_body(serde_json::json!({"approved": true}));
            });
            let comment = server.mock(|when, then| {
                when.method(POST)
                    .path("/repositories/acme/widget/pullrequests/7/comments")
                    .body_includes("\"raw\":\"nice work\"");
                then.status(201).json_body(serde_json::json!({
                    "id": 88,
                    "content": {"raw": "nice work"},
                    "created_on": "2024-01-01T00:00:00Z"
                }));
            });

            let provider = create_test_provider(&server);
            provider
                .submit_review(7, "nice work", ReviewEvent::Approve)
                .await
                .unwrap();
            approve.assert_hits(1);
            comment.assert_hits(1);
        }

        #[tokio::test]
        async fn test_add_diff_comment_left_side_uses_from() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/repositories/acme/widget/pullrequests/7/comments")
                    .json_body(serde_json::json!({
                        "content": {"raw": "old line issue"},
                        "inline": {"path": "src/lib.rs", "from": 12}
                    }));
                then.status(201).json_body(serde_json::json!({
                    "id": 90,
                    "content": {"raw": "old line issue"},
                    "inline": {"path": "src/lib.rs", "from": 12},
                    "created_on": "2024-01-01T00:00:00Z"
                }));
            });

            let provider = create_test_provider(&server);
            let comment = provider
                .add_diff_comment(
                    7,
                    DiffCommentInput {
                        body: "old line issue".to_string(),
                        commit_sha: None,
                        path: "src/lib.rs".to_string(),
                        line: 12,
                        side: DiffSide::Left,
                    },
                )
                .await
                .unwrap();

            assert_eq!(comment.side, Some(DiffSide::Left));
            assert_eq!(comment.line, Some(12));
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_merge_sends_strategy() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/repositories/acme/widget/pullrequests/7/merge")
                    .body_includes("\"merge_strategy\":\"squash\"");
                then.status(200).json_body(pull_json(7));
            });

            let provider = create_test_provider(&server);
            provider.merge_pr(7, MergeStrategy::Squash).await.unwrap();
            mock.assert_hits(1);
        }

        #[tokio::test]
        async fn test_unsupported_operations_fail_typed() {
            let server = MockServer::start();
            let provider = create_test_provider(&server);

            for err in [
                provider.create_pending_review(7).await.unwrap_err(),
                provider.resolve_thread("1").await.unwrap_err(),
                provider.convert_to_draft("7").await.unwrap_err(),
                provider.add_labels(7, &["bug".to_string()]).await.unwrap_err(),
                provider.reopen_pr(7).await.unwrap_err(),
                provider.merge_pr(7, MergeStrategy::Rebase).await.unwrap_err(),
            ] {
                assert!(matches!(err, ApiError::Bitbucket(_)));
            }
        }

        #[tokio::test]
        async fn test_get_my_prs_filters_by_author_uuid() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/user");
                then.status(200).json_body(serde_json::json!({
                    "nickname": "me", "uuid": "{abc-123}"
                }));
            });
            let query = server.mock(|when, then| {
                when.method(GET)
                    .path("/repositories/acme/widget/pullrequests")
                    .query_param("q", r#"state="OPEN" AND author.uuid="{abc-123}""#);
                then.status(200).json_body(serde_json::json!({
                    "values": [pull_json(3)]
                }));
            });

            let provider = create_test_provider(&server);
            let prs = provider.get_my_prs().await.unwrap();
            assert_eq!(prs.len(), 1);
            assert_eq!(prs[0].number, 3);
            query.assert_hits(1);
        }

        #[tokio::test]
        async fn test_get_review_threads_groups_inline_comments() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/repositories/acme/widget/pullrequests/7/comments");
                then.status(200).json_body(serde_json::json!({
                    "values": [
                        comment_json(1, None, true),
                        comment_json(2, Some(1), true),
                        comment_json(9, None, false)
                    ]
                }));
            });

            let provider = create_test_provider(&server);
            let threads = provider.get_review_threads(7).await.unwrap();
            assert_eq!(threads.len(), 1);
            assert_eq!(threads[0].comments.len(), 2);
        }
    }
}
