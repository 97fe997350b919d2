//! Core traits, types, and error handling for revu.
//!
//! This crate provides the foundational abstractions used across all revu
//! components: the unified review data model, the closed error taxonomy,
//! the capability-gated `Provider` contract, and TOML configuration.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{Config, ProviderConfig};
pub use error::{ApiError, HttpFailure, ProviderKind, Result};
pub use provider::{Provider, ProviderCapabilities};
pub use types::{
    CheckRun, Comment, Commit, DiffCommentInput, DiffSide, FileChange, IssueComment,
    MergeStrategy, PendingReview, PrState, PrStateFilter, PullRequest, Review, ReviewEvent,
    ReviewThread, ThreadComment, User,
};
