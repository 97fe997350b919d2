//! GitLab provider implementation for revu.
//!
//! GitLab's model diverges from the unified one in several places: merge
//! requests instead of pull requests, discussions scoped to an MR iid
//! instead of opaque thread ids, no pending reviews, and no first-class
//! draft toggle. This adapter absorbs all of those mismatches so callers
//! never branch on the platform.

mod client;
mod handles;
mod types;

pub use client::GitLabProvider;
pub use handles::{decode_thread_id, encode_thread_id};
pub use types::*;

/// Default GitLab instance URL.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
