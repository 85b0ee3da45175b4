// Port Layer - Interfaces for external dependencies

pub mod merge_request_source;
pub mod time_provider; // For deterministic testing
pub mod token_source;

// Re-exports
pub use merge_request_source::{FetchError, MergeRequestSource};
pub use time_provider::TimeProvider;
pub use token_source::TokenSource;
