// Work Item Domain Model

use std::time::Duration;
use tokio::time::Instant;

/// Unit of work passed from producers to consumers through the shared queue.
///
/// `created` is monotonic so latency survives wall-clock adjustments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub token: String,
    pub created: Instant,
}

impl WorkItem {
    pub fn new(token: impl Into<String>, created: Instant) -> Self {
        Self {
            token: token.into(),
            created,
        }
    }

    /// Stamp a token with the current monotonic time
    pub fn stamped_now(token: impl Into<String>) -> Self {
        Self::new(token, Instant::now())
    }

    /// Time elapsed since the item was produced
    pub fn latency(&self) -> Duration {
        self.created.elapsed()
    }
}
