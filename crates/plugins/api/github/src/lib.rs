//! GitHub provider implementation for revu.
//!
//! REST for everything GitHub's REST API can express; GraphQL for review
//! threads, thread resolution, the pending-review lifecycle, and draft
//! conversion, since REST has no thread or draft-toggle concept.

mod client;
mod graphql;
mod types;

pub use client::GitHubProvider;
pub use types::*;

/// Default GitHub REST API URL.
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";
