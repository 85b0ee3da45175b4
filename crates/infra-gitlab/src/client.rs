// GitLab merge request client (reqwest)

use asyncflow_core::domain::{MergeRequestQuery, MergeRequestRecord};
use asyncflow_core::port::{FetchError, MergeRequestSource};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Response;
use std::time::Duration;
use tracing::debug;

/// Credential header expected by GitLab
pub const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Pagination header carrying the number of pages
pub const TOTAL_PAGES_HEADER: &str = "x-total-pages";

/// Total request timeout (60s)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// GitLab REST v4 client for group merge requests
pub struct GitLabClient {
    base_url: String,
    private_token: String,
    http: reqwest::Client,
}

impl GitLabClient {
    /// Create a client with the default timeout
    pub fn new(base_url: &str, private_token: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, private_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        private_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            private_token: private_token.into(),
            http,
        })
    }

    fn merge_requests_url(&self, query: &MergeRequestQuery) -> String {
        format!(
            "{}/api/v4/groups/{}/merge_requests",
            self.base_url, query.group_id
        )
    }

    /// Query parameters shared by the probe and the page fetch
    fn scope_params(query: &MergeRequestQuery) -> Vec<(&'static str, String)> {
        vec![
            ("state", query.state.as_str().to_string()),
            ("per_page", query.per_page.to_string()),
            ("created_after", query.created_after_param()),
        ]
    }
}

/// Map a non-success status to `FetchError::Status`
fn ensure_success(resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport(err.to_string())
}

/// Read the page count from the pagination header
pub fn parse_total_pages(headers: &HeaderMap) -> Result<u32, FetchError> {
    let raw = headers.get(TOTAL_PAGES_HEADER).ok_or_else(|| {
        FetchError::Protocol(format!("missing {} header", TOTAL_PAGES_HEADER))
    })?;
    let text = raw.to_str().map_err(|_| {
        FetchError::Protocol(format!("{} header is not valid text", TOTAL_PAGES_HEADER))
    })?;
    text.trim().parse::<u32>().map_err(|_| {
        FetchError::Protocol(format!(
            "{} header is not a page count: {:?}",
            TOTAL_PAGES_HEADER, text
        ))
    })
}

#[async_trait]
impl MergeRequestSource for GitLabClient {
    async fn page_count(&self, query: &MergeRequestQuery) -> Result<u32, FetchError> {
        let url = self.merge_requests_url(query);
        let resp = self
            .http
            .head(&url)
            .header(PRIVATE_TOKEN_HEADER, &self.private_token)
            .query(&Self::scope_params(query))
            .send()
            .await
            .map_err(transport)?;
        let resp = ensure_success(resp)?;

        let pages = parse_total_pages(resp.headers())?;
        debug!(url = %url, pages, "Probed page count");
        Ok(pages)
    }

    async fn fetch_page(
        &self,
        query: &MergeRequestQuery,
        page: u32,
    ) -> Result<Vec<MergeRequestRecord>, FetchError> {
        let mut params = Self::scope_params(query);
        params.push(("view", "simple".to_string()));
        params.push(("page", page.to_string()));

        let resp = self
            .http
            .get(self.merge_requests_url(query))
            .header(PRIVATE_TOKEN_HEADER, &self.private_token)
            .query(&params)
            .send()
            .await
            .map_err(transport)?;
        let resp = ensure_success(resp)?;

        resp.json::<Vec<MergeRequestRecord>>().await.map_err(|e| {
            FetchError::Protocol(format!("failed to decode page {}: {}", page, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_total_pages() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from_static("7"));
        assert_eq!(parse_total_pages(&headers), Ok(7));
    }

    #[test]
    fn test_parse_total_pages_missing() {
        let err = parse_total_pages(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, FetchError::Protocol(ref m) if m.contains("missing")));
    }

    #[test]
    fn test_parse_total_pages_non_numeric() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from_static("many"));
        assert!(matches!(
            parse_total_pages(&headers),
            Err(FetchError::Protocol(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GitLabClient::new("https://gitlab.example.com/", "t").unwrap();
        let query = MergeRequestQuery::merged_last_year("9", chrono::Utc::now()).unwrap();
        assert_eq!(
            client.merge_requests_url(&query),
            "https://gitlab.example.com/api/v4/groups/9/merge_requests"
        );
    }
}
