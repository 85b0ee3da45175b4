// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::port::FetchError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::application::pipeline::QueueError),

    #[error("Task failed: {0}")]
    Task(String),
}

impl AppError {
    /// True for non-success HTTP statuses and network failures
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Fetch(e) if e.is_transport())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            AppError::Task(format!("task panicked: {}", err))
        } else {
            AppError::Task(format!("task cancelled: {}", err))
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
