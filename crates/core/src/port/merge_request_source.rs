// Merge Request Source Port
// Abstraction over the paginated merge request API (probe + page fetch)

use crate::domain::{MergeRequestQuery, MergeRequestRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Fetch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS or timeout failure before a status was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Missing or malformed header, or undecodable body
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl FetchError {
    /// True for network failures and non-success statuses
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

/// Merge Request Source trait
///
/// Implementations:
/// - GitLabClient: GitLab REST v4 over HTTP
/// - MockMergeRequestSource: in-memory pages for tests
#[async_trait]
pub trait MergeRequestSource: Send + Sync {
    /// Metadata-only request returning the total number of pages
    ///
    /// # Errors
    /// - FetchError::Status if the response is not a success
    /// - FetchError::Protocol if the page-count header is absent or non-numeric
    async fn page_count(&self, query: &MergeRequestQuery) -> Result<u32, FetchError>;

    /// Fetch one page (1-based) of merge requests
    async fn fetch_page(
        &self,
        query: &MergeRequestQuery,
        page: u32,
    ) -> Result<Vec<MergeRequestRecord>, FetchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock source serving pre-built pages and recording every call
    #[derive(Clone, Default)]
    pub struct MockMergeRequestSource {
        pages: Arc<Mutex<Vec<Vec<MergeRequestRecord>>>>,
        probe_error: Arc<Mutex<Option<FetchError>>>,
        page_errors: Arc<Mutex<HashMap<u32, FetchError>>>,
        page_delay: Arc<Mutex<Option<Duration>>>,
        probe_calls: Arc<Mutex<usize>>,
        fetched_pages: Arc<Mutex<Vec<u32>>>,
    }

    impl MockMergeRequestSource {
        pub fn new(pages: Vec<Vec<MergeRequestRecord>>) -> Self {
            Self {
                pages: Arc::new(Mutex::new(pages)),
                ..Default::default()
            }
        }

        /// Probe fails with the given error
        pub fn failing_probe(error: FetchError) -> Self {
            let source = Self::default();
            *source.probe_error.lock().unwrap() = Some(error);
            source
        }

        /// Make one page fail
        pub fn fail_page(self, page: u32, error: FetchError) -> Self {
            self.page_errors.lock().unwrap().insert(page, error);
            self
        }

        /// Delay every page fetch (to keep fetchers in flight)
        pub fn with_page_delay(self, delay: Duration) -> Self {
            *self.page_delay.lock().unwrap() = Some(delay);
            self
        }

        pub fn probe_calls(&self) -> usize {
            *self.probe_calls.lock().unwrap()
        }

        /// Page indices fetched, in call order
        pub fn fetched_pages(&self) -> Vec<u32> {
            self.fetched_pages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MergeRequestSource for MockMergeRequestSource {
        async fn page_count(&self, _query: &MergeRequestQuery) -> Result<u32, FetchError> {
            *self.probe_calls.lock().unwrap() += 1;
            if let Some(err) = self.probe_error.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self.pages.lock().unwrap().len() as u32)
        }

        async fn fetch_page(
            &self,
            _query: &MergeRequestQuery,
            page: u32,
        ) -> Result<Vec<MergeRequestRecord>, FetchError> {
            self.fetched_pages.lock().unwrap().push(page);

            let delay = *self.page_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(err) = self.page_errors.lock().unwrap().get(&page).cloned() {
                return Err(err);
            }

            let pages = self.pages.lock().unwrap();
            pages
                .get(page.saturating_sub(1) as usize)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    url: format!("mock://page/{}", page),
                })
        }
    }
}
