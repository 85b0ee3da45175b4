// Domain Layer - Pure business logic and entities

pub mod error;
pub mod merge_request;
pub mod work_item;

// Re-exports
pub use error::DomainError;
pub use merge_request::{GroupId, MergeRequestQuery, MergeRequestRecord, MergeRequestState};
pub use work_item::WorkItem;
