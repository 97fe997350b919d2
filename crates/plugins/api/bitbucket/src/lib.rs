//! Bitbucket Cloud provider implementation for revu.
//!
//! API 2.0 paginates through a `next` URL inside the response body rather
//! than a `Link` header, and has no review threads, drafts, or pending
//! reviews; those operations fail with typed errors.

mod client;
mod types;

pub use client::BitbucketProvider;
pub use types::*;

/// Default Bitbucket Cloud API URL.
pub const DEFAULT_BITBUCKET_URL: &str = "https://api.bitbucket.org/2.0";
