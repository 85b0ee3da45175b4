//! Shared fixtures for the end-to-end tests

use asyncflow_core::domain::merge_request::format_timestamp;
use asyncflow_core::domain::{MergeRequestQuery, MergeRequestRecord};
use asyncflow_core::port::time_provider::FixedTimeProvider;
use asyncflow_core::port::TimeProvider;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Creation time shared by every fixture record
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

/// Record whose age is exactly `age_minutes`
pub fn merge_request(id: u64, age_minutes: i64) -> MergeRequestRecord {
    let created = epoch();
    let updated = created + Duration::minutes(age_minutes);
    MergeRequestRecord::new(id, format_timestamp(created), format_timestamp(updated))
}

/// Split records into pages of `per_page`
pub fn paginate(records: Vec<MergeRequestRecord>, per_page: usize) -> Vec<Vec<MergeRequestRecord>> {
    records.chunks(per_page).map(|c| c.to_vec()).collect()
}

/// Merged-last-year query for group 42, anchored at a fixed instant
pub fn fixed_query() -> MergeRequestQuery {
    let clock = FixedTimeProvider(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    MergeRequestQuery::merged_last_year("42", clock.now_utc()).unwrap()
}
