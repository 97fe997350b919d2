//! Azure DevOps provider implementation for revu.
//!
//! Threads are first-class here (the only platform besides GitHub where
//! resolution works natively), reviews are reviewer votes, and drafts are a
//! plain `isDraft` flag. Comment ids are only unique within their thread, so
//! the unified comment id is a composite of both.

mod client;
mod types;

pub use client::AzureProvider;
pub use types::*;

/// Default Azure DevOps URL.
pub const DEFAULT_AZURE_URL: &str = "https://dev.azure.com";

/// API version sent with every request.
pub const API_VERSION: &str = "7.1";
