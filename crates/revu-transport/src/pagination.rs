//! Link-header pagination.
//!
//! Pages are fetched strictly sequentially — each request depends on the
//! previous response's `Link` header — and a hard page cap bounds worst-case
//! latency against a misbehaving server.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use revu_core::error::{ApiError, Result};

use crate::client::Transport;

/// Hard cap on pages traversed by one paginated fetch.
pub const MAX_PAGES: usize = 20;

/// Page size appended to the first request when the caller's path does not
/// already specify one.
const DEFAULT_PER_PAGE: &str = "per_page=100";

/// One explicitly-fetched page.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
}

/// Envelope returned by search endpoints.
#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    #[allow(dead_code)]
    total_count: u64,
    #[allow(dead_code)]
    incomplete_results: bool,
    items: Vec<T>,
}

/// Extract the `rel="next"` target from a `Link` header.
///
/// Splits on `,`, matches `<url>; rel="next"` per segment tolerating extra
/// whitespace, and returns the first match. Malformed input degrades to
/// `None` ("no next page"), never an error.
pub fn parse_link_header(header: &str) -> Option<String> {
    for segment in header.split(',') {
        let mut parts = segment.splitn(2, ';');
        let (Some(url_part), Some(rel_part)) = (parts.next(), parts.next()) else {
            continue;
        };
        let url_part = url_part.trim();
        if !(url_part.starts_with('<') && url_part.ends_with('>')) {
            continue;
        }
        if rel_part.trim() == "rel=\"next\"" {
            return Some(url_part[1..url_part.len() - 1].to_string());
        }
    }
    None
}

fn with_default_per_page(path: &str) -> String {
    if path.contains("per_page=") {
        return path.to_string();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, DEFAULT_PER_PAGE)
}

impl Transport {
    /// Follow `rel="next"` links from `path`, concatenating each page's
    /// decoded array, until no link remains or [`MAX_PAGES`] is reached.
    pub async fn fetch_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut next = Some(with_default_per_page(path));
        let mut items = Vec::new();
        let mut pages = 0;

        while let Some(target) = next {
            if pages >= MAX_PAGES {
                break;
            }
            if self.cancelled() {
                return Err(ApiError::Cancelled);
            }

            let url = self.url(&target);
            let response = self.execute::<()>(Method::GET, &url, None).await?;
            let link = Self::link_header(response.headers());
            let page: Vec<T> = self.decode(response).await?;
            items.extend(page);

            pages += 1;
            next = link.as_deref().and_then(parse_link_header);
        }

        Ok(items)
    }

    /// Same Link-header loop over `{total_count, incomplete_results, items}`
    /// search envelopes, concatenating `items`.
    pub async fn fetch_search_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>> {
        let mut next = Some(with_default_per_page(path));
        let mut items = Vec::new();
        let mut pages = 0;

        while let Some(target) = next {
            if pages >= MAX_PAGES {
                break;
            }
            if self.cancelled() {
                return Err(ApiError::Cancelled);
            }

            let url = self.url(&target);
            let response = self.execute::<()>(Method::GET, &url, None).await?;
            let link = Self::link_header(response.headers());
            let page: SearchPage<T> = self.decode(response).await?;
            items.extend(page.items);

            pages += 1;
            next = link.as_deref().and_then(parse_link_header);
        }

        Ok(items)
    }

    /// Fetch exactly one page for callers that drive pagination themselves.
    /// `has_next_page` is true iff a `rel="next"` link was present.
    pub async fn fetch_single_page<T: DeserializeOwned>(&self, path: &str) -> Result<Page<T>> {
        let url = self.url(&with_default_per_page(path));
        let response = self.execute::<()>(Method::GET, &url, None).await?;
        let link = Self::link_header(response.headers());
        let items: Vec<T> = self.decode(response).await?;

        Ok(Page {
            items,
            has_next_page: link.as_deref().and_then(parse_link_header).is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use revu_core::error::ProviderKind;

    #[test]
    fn link_header_returns_next_url() {
        let header = r#"<https://api.github.com/repos/o/r/pulls?page=2>; rel="next", <https://api.github.com/repos/o/r/pulls?page=9>; rel="last""#;
        assert_eq!(
            parse_link_header(header).as_deref(),
            Some("https://api.github.com/repos/o/r/pulls?page=2")
        );
    }

    #[test]
    fn link_header_tolerates_extra_whitespace() {
        let header = r#" <https://h/p?page=2> ;  rel="next" "#;
        assert_eq!(parse_link_header(header).as_deref(), Some("https://h/p?page=2"));
    }

    #[test]
    fn link_header_without_next_is_none() {
        assert_eq!(
            parse_link_header(r#"<https://h/p?page=1>; rel="prev", <https://h/p?page=9>; rel="last""#),
            None
        );
    }

    #[test]
    fn link_header_malformed_is_none() {
        assert_eq!(parse_link_header(""), None);
        assert_eq!(parse_link_header("garbage"), None);
        assert_eq!(parse_link_header(r#"https://h/p; rel="next""#), None);
        assert_eq!(parse_link_header(r#"<https://h/p>"#), None);
    }

    #[test]
    fn default_per_page_appended_once() {
        assert_eq!(with_default_per_page("/pulls"), "/pulls?per_page=100");
        assert_eq!(
            with_default_per_page("/pulls?state=open"),
            "/pulls?state=open&per_page=100"
        );
        assert_eq!(
            with_default_per_page("/pulls?per_page=30"),
            "/pulls?per_page=30"
        );
    }

    fn transport(server: &MockServer) -> Transport {
        Transport::new(ProviderKind::GitHub, server.base_url(), "test-token")
    }

    #[tokio::test]
    async fn follows_next_links_and_concatenates() {
        let server = MockServer::start();

        let page1 = server.mock(|when, then| {
            when.method(GET).path("/items").query_param("per_page", "100");
            then.status(200)
                .header(
                    "link",
                    format!("<{}/items-page2>; rel=\"next\"", server.base_url()),
                )
                .json_body(serde_json::json!([1, 2, 3]));
        });
        let page2 = server.mock(|when, then| {
            when.method(GET).path("/items-page2");
            then.status(200).json_body(serde_json::json!([4, 5]));
        });

        let items: Vec<u64> = transport(&server).fetch_paginated("/items").await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        page1.assert_hits(1);
        page2.assert_hits(1);
    }

    #[tokio::test]
    async fn single_request_without_link_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/items");
            then.status(200).json_body(serde_json::json!([7]));
        });

        let items: Vec<u64> = transport(&server).fetch_paginated("/items").await.unwrap();
        assert_eq!(items, vec![7]);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn page_cap_stops_runaway_loops() {
        let server = MockServer::start();
        // Server always advertises another page
        let mock = server.mock(|when, then| {
            when.method(GET).path("/items");
            then.status(200)
                .header(
                    "link",
                    format!("<{}/items?per_page=100>; rel=\"next\"", server.base_url()),
                )
                .json_body(serde_json::json!([0]));
        });

        let items: Vec<u64> = transport(&server).fetch_paginated("/items").await.unwrap();
        assert_eq!(items.len(), MAX_PAGES);
        mock.assert_hits(MAX_PAGES);
    }

    #[tokio::test]
    async fn failed_page_surfaces_immediately() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/items").query_param("per_page", "100");
            then.status(200)
                .header(
                    "link",
                    format!("<{}/items-page2>; rel=\"next\"", server.base_url()),
                )
                .json_body(serde_json::json!([1]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/items-page2");
            then.status(500).body("boom");
        });

        let err = transport(&server)
            .fetch_paginated::<u64>("/items")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn search_pagination_concatenates_items() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search").query_param("per_page", "100");
            then.status(200)
                .header(
                    "link",
                    format!("<{}/search-page2>; rel=\"next\"", server.base_url()),
                )
                .json_body(serde_json::json!({
                    "total_count": 3,
                    "incomplete_results": false,
                    "items": ["a", "b"]
                }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/search-page2");
            then.status(200).json_body(serde_json::json!({
                "total_count": 3,
                "incomplete_results": false,
                "items": ["c"]
            }));
        });

        let items: Vec<String> = transport(&server)
            .fetch_search_paginated("/search")
            .await
            .unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn single_page_reports_next_link() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/items");
            then.status(200)
                .header(
                    "link",
                    format!("<{}/items?page=2>; rel=\"next\"", server.base_url()),
                )
                .json_body(serde_json::json!([1, 2]));
        });

        let page: Page<u64> = transport(&server).fetch_single_page("/items").await.unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn single_page_without_link_has_no_next() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/items");
            then.status(200).json_body(serde_json::json!([]));
        });

        let page: Page<u64> = transport(&server).fetch_single_page("/items").await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next_page);
    }
}
