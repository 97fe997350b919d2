//! Base-URL derivation for public and self-hosted instances.

/// Public GitHub REST host.
pub const GITHUB_PUBLIC_REST: &str = "https://api.github.com";

/// GraphQL endpoint of the public GitHub host.
const GITHUB_PUBLIC_GRAPHQL: &str = "https://api.github.com/graphql";

/// REST API suffix used by GitHub Enterprise instances.
const GHE_REST_SUFFIX: &str = "/api/v3";

/// GraphQL suffix that replaces the GHE REST suffix.
const GHE_GRAPHQL_SUFFIX: &str = "/api/graphql";

/// REST base URL, defaulting to the public host.
pub fn github_rest_url(base_url: Option<&str>) -> String {
    match base_url {
        Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
        _ => GITHUB_PUBLIC_REST.to_string(),
    }
}

/// Derive the GraphQL endpoint from a REST base URL.
///
/// The public host has a fixed sibling path; a GitHub Enterprise base ending
/// in `/api/v3` swaps that suffix for `/api/graphql`; any other base gets
/// `/graphql` appended as a fallback.
pub fn github_graphql_url(base_url: Option<&str>) -> String {
    let rest = github_rest_url(base_url);
    if rest == GITHUB_PUBLIC_REST {
        return GITHUB_PUBLIC_GRAPHQL.to_string();
    }
    if let Some(host) = rest.strip_suffix(GHE_REST_SUFFIX) {
        return format!("{}{}", host, GHE_GRAPHQL_SUFFIX);
    }
    format!("{}/graphql", rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_url_defaults_to_public_host() {
        assert_eq!(github_rest_url(None), "https://api.github.com");
        assert_eq!(github_rest_url(Some("")), "https://api.github.com");
        assert_eq!(
            github_rest_url(Some("https://ghe.example.com/api/v3/")),
            "https://ghe.example.com/api/v3"
        );
    }

    #[test]
    fn graphql_url_public_host() {
        assert_eq!(github_graphql_url(None), "https://api.github.com/graphql");
        assert_eq!(
            github_graphql_url(Some("https://api.github.com")),
            "https://api.github.com/graphql"
        );
    }

    #[test]
    fn graphql_url_ghe_suffix_swap() {
        assert_eq!(
            github_graphql_url(Some("https://h/api/v3")),
            "https://h/api/graphql"
        );
    }

    #[test]
    fn graphql_url_fallback_append() {
        assert_eq!(
            github_graphql_url(Some("https://proxy.example.com/gh")),
            "https://proxy.example.com/gh/graphql"
        );
    }
}
