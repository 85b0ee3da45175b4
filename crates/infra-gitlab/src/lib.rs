// asyncflow GitLab adapter
// Implements MergeRequestSource over the GitLab REST v4 API

pub mod client;

pub use client::{GitLabClient, DEFAULT_TIMEOUT, PRIVATE_TOKEN_HEADER, TOTAL_PAGES_HEADER};
