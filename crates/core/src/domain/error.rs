// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Percentile requested over empty input")]
    EmptyInput,

    #[error("Invalid percentile: {0} (expected 0..=100)")]
    InvalidPercentile(f64),

    #[error("Poller {idx} gave up after {attempts} attempts")]
    PollExhausted { idx: usize, attempts: u32 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
