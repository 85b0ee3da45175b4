// Application Layer - Use Cases and Concurrency Patterns

pub mod aggregator;
pub mod pipeline;
pub mod polling;
pub mod stats;

// Re-exports
pub use aggregator::{AgeReport, MergeRequestAgeAggregator};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport, WorkQueue};
pub use polling::{poll_all, poll_all_with, PollConfig, PollOutcome, ThresholdPoller};
