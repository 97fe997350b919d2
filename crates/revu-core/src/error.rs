//! Error taxonomy shared by every provider adapter.
//!
//! Every failure an adapter can produce is a value of [`ApiError`]; adapters
//! never panic on expected failures and never swallow an error to return a
//! default. The union is closed: one platform-specific variant per backend
//! plus transport-level, auth, cancellation, and config variants.

use thiserror::Error;

/// Detail attached to a platform-specific HTTP or GraphQL failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpFailure {
    /// Human-readable summary.
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Request URL, when known.
    pub url: Option<String>,
    /// Raw response body or decode diagnostics.
    pub detail: Option<String>,
    /// Cooldown hint in milliseconds, populated only for 429 responses
    /// carrying a parseable `Retry-After` header.
    pub retry_after_ms: Option<u64>,
}

impl HttpFailure {
    /// Build a failure from a summary message alone.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Main error type for revu operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// GitHub returned an error response
    #[error("GitHub error: {0}")]
    GitHub(HttpFailure),

    /// GitLab returned an error response
    #[error("GitLab error: {0}")]
    GitLab(HttpFailure),

    /// Bitbucket returned an error response
    #[error("Bitbucket error: {0}")]
    Bitbucket(HttpFailure),

    /// Azure DevOps returned an error response
    #[error("Azure DevOps error: {0}")]
    Azure(HttpFailure),

    /// Gitea returned an error response
    #[error("Gitea error: {0}")]
    Gitea(HttpFailure),

    /// Transport-level failure: DNS, connection refused, timeout. The
    /// request never produced a response.
    #[error("network error: {message}")]
    Network {
        message: String,
        url: Option<String>,
    },

    /// Token missing or rejected before a request was attempted
    #[error("authentication error: {0}")]
    Auth(String),

    /// The caller abandoned the operation via its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the originating response, if any.
    pub fn status(&self) -> Option<u16> {
        self.failure().and_then(|f| f.status)
    }

    /// Cooldown hint from a 429 response, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        self.failure().and_then(|f| f.retry_after_ms)
    }

    /// The platform-specific failure payload, when this is a provider error.
    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::GitHub(f)
            | Self::GitLab(f)
            | Self::Bitbucket(f)
            | Self::Azure(f)
            | Self::Gitea(f) => Some(f),
            _ => None,
        }
    }
}

/// Result type alias for revu operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// The five supported hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    GitHub,
    GitLab,
    Bitbucket,
    #[serde(rename = "azure")]
    AzureDevOps,
    Gitea,
}

impl ProviderKind {
    /// Wrap a failure payload in this platform's error variant.
    pub fn error(self, failure: HttpFailure) -> ApiError {
        match self {
            Self::GitHub => ApiError::GitHub(failure),
            Self::GitLab => ApiError::GitLab(failure),
            Self::Bitbucket => ApiError::Bitbucket(failure),
            Self::AzureDevOps => ApiError::Azure(failure),
            Self::Gitea => ApiError::Gitea(failure),
        }
    }

    /// Short name used in logs and config keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::AzureDevOps => "azure",
            Self::Gitea => "gitea",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_selects_variant() {
        let err = ProviderKind::GitLab.error(HttpFailure {
            message: "boom".to_string(),
            status: Some(404),
            ..Default::default()
        });
        assert!(matches!(err, ApiError::GitLab(_)));
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.retry_after_ms(), None);
    }

    #[test]
    fn retry_after_only_on_provider_errors() {
        let err = ProviderKind::GitHub.error(HttpFailure {
            message: "rate limited".to_string(),
            status: Some(429),
            retry_after_ms: Some(60_000),
            ..Default::default()
        });
        assert_eq!(err.retry_after_ms(), Some(60_000));

        let net = ApiError::Network {
            message: "connection refused".to_string(),
            url: None,
        };
        assert_eq!(net.retry_after_ms(), None);
        assert_eq!(net.status(), None);
    }

    #[test]
    fn display_includes_status() {
        let failure = HttpFailure {
            message: "not found".to_string(),
            status: Some(404),
            ..Default::default()
        };
        assert_eq!(
            ApiError::Gitea(failure).to_string(),
            "Gitea error: not found (status 404)"
        );
    }
}
