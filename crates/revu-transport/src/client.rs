//! Request execution and error classification.

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use revu_core::error::{ApiError, HttpFailure, ProviderKind, Result};

use crate::auth::TokenExpiryNotice;
use crate::ratelimit::{parse_retry_after, RateLimitCell};

/// How the token is presented to the platform.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>` (GitHub, Bitbucket)
    Bearer,
    /// `PRIVATE-TOKEN: <token>` (GitLab)
    PrivateToken,
    /// Basic auth with the token as password (Azure DevOps PAT)
    Basic { user: String },
    /// `Authorization: token <token>` (Gitea)
    Token,
}

/// One platform's HTTP/GraphQL executor.
///
/// Holds no per-request mutable state; concurrent calls are safe. The only
/// shared mutable pieces are the advisory [`RateLimitCell`] and the
/// [`TokenExpiryNotice`], both designed for concurrent access.
pub struct Transport {
    client: reqwest::Client,
    kind: ProviderKind,
    base_url: String,
    graphql_url: Option<String>,
    token: String,
    auth: AuthScheme,
    accept: Option<&'static str>,
    api_version: Option<(&'static str, &'static str)>,
    rate_limit: RateLimitCell,
    token_expiry: TokenExpiryNotice,
    cancel: CancellationToken,
}

impl Transport {
    /// Create a transport for `kind` rooted at `base_url`, authenticating
    /// with `Bearer` by default.
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("revu")
                .build()
                .unwrap_or_default(),
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            graphql_url: None,
            token: token.into(),
            auth: AuthScheme::Bearer,
            accept: None,
            api_version: None,
            rate_limit: RateLimitCell::new(),
            token_expiry: TokenExpiryNotice::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_auth_scheme(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Fixed `Accept` header (e.g. `application/vnd.github+json`).
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Fixed API-version header where the platform requires one.
    pub fn with_api_version(mut self, name: &'static str, value: &'static str) -> Self {
        self.api_version = Some((name, value));
        self
    }

    /// GraphQL endpoint for adapters that need one.
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = Some(url.into());
        self
    }

    /// Cancellation token checked before every request; a cancelled token
    /// stops pagination loops between pages.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Advisory rate-limit snapshot cell (this transport is its sole writer).
    pub fn rate_limit(&self) -> &RateLimitCell {
        &self.rate_limit
    }

    /// Token-expiry broadcaster fired on 401 responses.
    pub fn token_expiry(&self) -> &TokenExpiryNotice {
        &self.token_expiry
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs (pagination links)
    /// pass through untouched.
    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn apply_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = match &self.auth {
            AuthScheme::Bearer => {
                builder.header(AUTHORIZATION, format!("Bearer {}", self.token))
            }
            AuthScheme::PrivateToken => builder.header("PRIVATE-TOKEN", &self.token),
            AuthScheme::Basic { user } => builder.basic_auth(user, Some(&self.token)),
            AuthScheme::Token => builder.header(AUTHORIZATION, format!("token {}", self.token)),
        };
        let builder = match self.accept {
            Some(accept) => builder.header(ACCEPT, accept),
            None => builder.header(ACCEPT, "application/json"),
        };
        match self.api_version {
            Some((name, value)) => builder.header(name, value),
            None => builder,
        }
    }

    /// Issue one request and classify the outcome. Success returns the raw
    /// response; every failure mode becomes exactly one `ApiError`.
    pub(crate) async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        debug!(provider = %self.kind, %method, url, "dispatching request");

        let mut builder = self.apply_headers(self.client.request(method, url));
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::Network {
            message: e.to_string(),
            url: Some(url.to_string()),
        })?;

        self.rate_limit.update_from_headers(response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.token_expiry.notify_expired();
        }

        let retry_after_ms = if status == StatusCode::TOO_MANY_REQUESTS {
            parse_retry_after(response.headers())
        } else {
            None
        };

        let detail = response.text().await.unwrap_or_default();
        warn!(provider = %self.kind, status = status.as_u16(), url, "error response");

        Err(self.kind.error(HttpFailure {
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            status: Some(status.as_u16()),
            url: Some(url.to_string()),
            detail: (!detail.is_empty()).then_some(detail),
            retry_after_ms,
        }))
    }

    /// Decode a response body against `T`; decode failure is a provider
    /// error, never a silently defaulted value.
    pub(crate) async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let url = response.url().to_string();
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| ApiError::Network {
            message: e.to_string(),
            url: Some(url.clone()),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            self.kind.error(HttpFailure {
                message: "failed to decode response body".to_string(),
                status: Some(status),
                url: Some(url),
                detail: Some(e.to_string()),
                retry_after_ms: None,
            })
        })
    }

    /// GET `path` and decode the body against `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.execute::<()>(Method::GET, &url, None).await?;
        self.decode(response).await
    }

    /// Issue a POST/PUT/PATCH/DELETE and decode the body against `T`.
    pub async fn mutate_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self.execute(method, &url, Some(body)).await?;
        self.decode(response).await
    }

    /// Mutation where any 2xx (including 204 No Content) is success and the
    /// body, if any, is discarded.
    pub async fn mutate_empty<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.url(path);
        self.execute(method, &url, body).await?;
        Ok(())
    }

    /// POST a GraphQL envelope and decode the `data` field against `T`.
    ///
    /// GraphQL's error channel is orthogonal to HTTP status: a non-empty
    /// `errors` array in an otherwise-200 response is a provider error, and
    /// a response with neither `data` nor `errors` is "missing data field".
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let url = self.graphql_url.clone().ok_or_else(|| {
            self.kind
                .error(HttpFailure::message("no GraphQL endpoint configured"))
        })?;

        let envelope = GraphqlRequest { query, variables };
        let response = self.execute(Method::POST, &url, Some(&envelope)).await?;
        let body: GraphqlResponse = self.decode(response).await?;

        if let Some(errors) = body.errors {
            if !errors.is_empty() {
                let message = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(self.kind.error(HttpFailure {
                    message,
                    status: Some(200),
                    url: Some(url),
                    detail: None,
                    retry_after_ms: None,
                }));
            }
        }

        let data = body.data.ok_or_else(|| {
            self.kind.error(HttpFailure {
                message: "missing data field".to_string(),
                status: Some(200),
                url: Some(url.clone()),
                detail: None,
                retry_after_ms: None,
            })
        })?;

        serde_json::from_value(data).map_err(|e| {
            self.kind.error(HttpFailure {
                message: "failed to decode GraphQL data".to_string(),
                status: Some(200),
                url: Some(url),
                detail: Some(e.to_string()),
                retry_after_ms: None,
            })
        })
    }

    pub(crate) fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Link header of a response, if present and readable.
    pub(crate) fn link_header(headers: &HeaderMap) -> Option<String> {
        headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}
