//! Shared REST/GraphQL transport helpers for revu provider adapters.
//!
//! Adapters describe *what* to call; this crate owns *how*: authentication
//! headers, JSON decoding, Link-header pagination, rate-limit bookkeeping,
//! Retry-After extraction, and the uniform mapping of failures into the
//! `ApiError` taxonomy. No request is ever retried here — a failed page or
//! mutation is surfaced immediately and retry policy stays with the caller.

mod auth;
mod client;
mod pagination;
mod ratelimit;
mod urls;

pub use auth::TokenExpiryNotice;
pub use client::{AuthScheme, Transport};
pub use pagination::{parse_link_header, Page, MAX_PAGES};
pub use ratelimit::{parse_retry_after, RateLimitCell, RateLimitSnapshot};
pub use urls::{github_graphql_url, github_rest_url};

pub use tokio_util::sync::CancellationToken;
