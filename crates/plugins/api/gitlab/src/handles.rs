//! Composite identifiers for resources GitLab scopes to a merge request.
//!
//! A discussion is only addressable as `(merge_request_iid, discussion_id)`,
//! and the draft toggle needs both the iid and the current title. Both pairs
//! travel through the provider contract as a single string handle.

use tracing::warn;

use revu_core::error::{HttpFailure, ProviderKind, Result};

/// Combine an MR iid and a discussion id into one thread handle.
pub fn encode_thread_id(iid: u64, discussion_id: &str) -> String {
    format!("{}:{}", iid, discussion_id)
}

/// Split a thread handle back into `(iid, discussion_id)`.
///
/// Splits on the first colon only, since discussion ids may themselves
/// contain colons. A handle without a colon is treated as a bare discussion
/// id with iid 0 rather than an error, so stale cached handles degrade to a
/// server-side 404 instead of failing locally.
pub fn decode_thread_id(thread_id: &str) -> (u64, String) {
    match thread_id.split_once(':') {
        Some((iid, discussion_id)) => {
            let iid = iid.parse().unwrap_or_else(|_| {
                warn!(thread_id, "non-numeric iid in thread handle");
                0
            });
            (iid, discussion_id.to_string())
        }
        None => {
            warn!(thread_id, "thread handle has no iid component");
            (0, thread_id.to_string())
        }
    }
}

/// Parse a `"{iid}:{title}"` draft handle. Unlike thread handles, a
/// malformed draft handle is a hard error: retitling the wrong MR is worse
/// than failing.
pub fn parse_draft_handle(handle: &str) -> Result<(u64, &str)> {
    let (iid, title) = handle.split_once(':').ok_or_else(|| {
        ProviderKind::GitLab.error(HttpFailure::message(format!(
            "malformed draft handle '{}': expected '{{iid}}:{{title}}'",
            handle
        )))
    })?;
    let iid = iid.parse().map_err(|_| {
        ProviderKind::GitLab.error(HttpFailure::message(format!(
            "malformed draft handle '{}': iid is not numeric",
            handle
        )))
    })?;
    Ok((iid, title))
}
