//! Gitea provider implementation for revu.
//!
//! Gitea's REST API is close to GitHub's, with a few gaps: no resolvable
//! review threads, no pending reviews, and no native draft flag on the write
//! side. Drafts are emulated through the "WIP: " title prefix, so draft
//! operations use a `"{number}:{title}"` handle instead of a bare number.

mod client;
mod types;

pub use client::GiteaProvider;
pub use types::*;

/// Default Gitea instance URL.
pub const DEFAULT_GITEA_URL: &str = "https://gitea.com";
