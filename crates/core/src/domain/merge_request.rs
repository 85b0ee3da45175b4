// Merge Request Domain Model
//
// Records are reduced to a single derived value (age in minutes) right after
// they are fetched; nothing here keeps them around.

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Months, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format used when rendering timestamps (`2023-01-01T00:00:00.000000Z`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Date and time part of an API timestamp, before the fraction
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Fraction digits accepted on input (`.0Z` through `.000000Z`)
pub const MAX_FRACTION_DIGITS: usize = 6;

/// Minutes in one day, used for age and percentile-to-days conversion
pub const MINUTES_PER_DAY: i64 = 1440;

const SECONDS_PER_DAY: i64 = 86_400;

/// Default page size for list requests
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size the API accepts
pub const MAX_PER_PAGE: u32 = 100;

/// How far back the created-after cutoff reaches
pub const CUTOFF_MONTHS: u32 = 12;

/// Parent group identifier
pub type GroupId = String;

/// Merge request state filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Closed,
    Locked,
    Merged,
    All,
}

impl MergeRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeRequestState::Opened => "opened",
            MergeRequestState::Closed => "closed",
            MergeRequestState::Locked => "locked",
            MergeRequestState::Merged => "merged",
            MergeRequestState::All => "all",
        }
    }
}

impl fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeRequestState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "opened" => Ok(MergeRequestState::Opened),
            "closed" => Ok(MergeRequestState::Closed),
            "locked" => Ok(MergeRequestState::Locked),
            "merged" => Ok(MergeRequestState::Merged),
            "all" => Ok(MergeRequestState::All),
            other => Err(DomainError::ValidationError(format!(
                "unknown merge request state: {}",
                other
            ))),
        }
    }
}

/// Merge request as returned by the list endpoint (`view=simple`)
///
/// Unknown fields are ignored; only the timestamps matter here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestRecord {
    pub id: u64,
    #[serde(default)]
    pub iid: Option<u64>,
    pub created_at: String,
    pub updated_at: String,
}

impl MergeRequestRecord {
    pub fn new(id: u64, created_at: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Self {
            id,
            iid: None,
            created_at: created_at.into(),
            updated_at: updated_at.into(),
        }
    }

    /// Minutes between creation and last update
    ///
    /// # Errors
    /// `DomainError::InvalidTimestamp` if either field is not a valid API timestamp
    pub fn age_minutes(&self) -> Result<f64> {
        let created = parse_timestamp(&self.created_at)?;
        let updated = parse_timestamp(&self.updated_at)?;
        Ok(minutes_between(created, updated))
    }
}

/// Parse an API timestamp: `%Y-%m-%dT%H:%M:%S.<1-6 digits>Z`
///
/// GitLab sends milliseconds (`.123Z`); shorter fractions are right-padded,
/// so `.5Z` is half a second.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let invalid = |reason: String| DomainError::InvalidTimestamp {
        value: value.to_string(),
        reason,
    };

    let (datetime, fraction) = value
        .strip_suffix('Z')
        .and_then(|rest| rest.rsplit_once('.'))
        .ok_or_else(|| invalid("expected fractional seconds followed by 'Z'".to_string()))?;

    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(format!(
            "fraction must be 1 to {} digits, got {:?}",
            MAX_FRACTION_DIGITS, fraction
        )));
    }

    let base = NaiveDateTime::parse_from_str(datetime, DATETIME_FORMAT)
        .map_err(|e| invalid(e.to_string()))?;
    let micros: u32 = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS)
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;

    base.with_nanosecond(micros * 1_000)
        .ok_or_else(|| invalid("fraction out of range".to_string()))
}

/// Format a UTC instant in the fixed API format
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `days * 1440 + seconds / 60` over the normalized difference.
///
/// The difference is normalized to whole days plus `0..86400` whole seconds
/// with the sub-second remainder dropped, so a negative delta of half a
/// second counts as -1 second.
pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    let whole_seconds = match delta.num_microseconds() {
        Some(micros) => micros.div_euclid(1_000_000),
        None => delta.num_seconds(),
    };
    let days = whole_seconds.div_euclid(SECONDS_PER_DAY);
    let seconds = whole_seconds.rem_euclid(SECONDS_PER_DAY);
    (days * MINUTES_PER_DAY) as f64 + seconds as f64 / 60.0
}

/// Floor-divide a minutes value into whole days
pub fn minutes_to_days(minutes: f64) -> i64 {
    (minutes / MINUTES_PER_DAY as f64).floor() as i64
}

/// One calendar year before `now` (Feb 29 maps to Feb 28)
pub fn cutoff_before(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(CUTOFF_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Fixed request scope shared by the page-count probe and every page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestQuery {
    pub group_id: GroupId,
    pub state: MergeRequestState,
    pub per_page: u32,
    pub created_after: DateTime<Utc>,
}

impl MergeRequestQuery {
    /// Create a query, validating the page size
    pub fn new(
        group_id: impl Into<GroupId>,
        state: MergeRequestState,
        per_page: u32,
        created_after: DateTime<Utc>,
    ) -> Result<Self> {
        let group_id = group_id.into();
        if group_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "group id cannot be empty".to_string(),
            ));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(DomainError::ValidationError(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, per_page
            )));
        }
        Ok(Self {
            group_id,
            state,
            per_page,
            created_after,
        })
    }

    /// Merged merge requests created during the year before `now`
    pub fn merged_last_year(group_id: impl Into<GroupId>, now: DateTime<Utc>) -> Result<Self> {
        Self::new(
            group_id,
            MergeRequestState::Merged,
            DEFAULT_PER_PAGE,
            cutoff_before(now),
        )
    }

    /// `created_after` rendered for the query string
    pub fn created_after_param(&self) -> String {
        format_timestamp(self.created_after)
    }

    /// 1-based inclusive record range covered by `page`
    pub fn record_range(&self, page: u32) -> (u64, u64) {
        let per_page = u64::from(self.per_page);
        let page = u64::from(page);
        (page.saturating_sub(1) * per_page + 1, page * per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_age_one_day_thirty_minutes() {
        let mr = MergeRequestRecord::new(
            1,
            "2023-01-01T00:00:00.000000Z",
            "2023-01-02T00:30:00.000000Z",
        );
        assert_eq!(mr.age_minutes().unwrap(), 1470.0);
    }

    #[test]
    fn test_age_keeps_fractional_minutes() {
        let mr = MergeRequestRecord::new(
            2,
            "2023-03-01T10:00:00.000000Z",
            "2023-03-01T10:00:30.900000Z",
        );
        assert_eq!(mr.age_minutes().unwrap(), 0.5);
    }

    #[test]
    fn test_negative_delta_normalizes_like_whole_days_plus_seconds() {
        let mr = MergeRequestRecord::new(
            3,
            "2023-03-01T10:00:00.500000Z",
            "2023-03-01T10:00:00.000000Z",
        );
        // -0.5s => -1 day + 86399s
        assert_eq!(mr.age_minutes().unwrap(), -1440.0 + 86_399.0 / 60.0);
    }

    #[test]
    fn test_malformed_timestamp_is_error() {
        let mr = MergeRequestRecord::new(4, "2023-01-01 00:00:00", "2023-01-02T00:30:00.000000Z");
        let err = mr.age_minutes().unwrap_err();
        assert!(matches!(err, DomainError::InvalidTimestamp { ref value, .. } if value == "2023-01-01 00:00:00"));
    }

    #[test]
    fn test_parse_accepts_short_fractions() {
        let micros = |v: &str| parse_timestamp(v).unwrap().nanosecond() / 1_000;

        assert_eq!(micros("2023-01-01T00:00:00.000000Z"), 0);
        assert_eq!(micros("2023-01-01T00:00:00.000Z"), 0);
        assert_eq!(micros("2023-01-01T00:00:00.123Z"), 123_000);
        assert_eq!(micros("2023-01-01T00:00:00.5Z"), 500_000);
        assert_eq!(micros("2023-01-01T00:00:00.000042Z"), 42);
    }

    #[test]
    fn test_parse_rejects_missing_or_long_fraction() {
        for value in [
            "2023-01-01T00:00:00Z",
            "2023-01-01T00:00:00.Z",
            "2023-01-01T00:00:00.1234567Z",
            "2023-01-01T00:00:00.123456789Z",
            "2023-01-01T00:00:00.12a4Z",
            "2023-01-01T00:00:00.000000",
            "2023-01-01T00:00.000Z",
        ] {
            assert!(
                matches!(parse_timestamp(value), Err(DomainError::InvalidTimestamp { .. })),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_millisecond_timestamps_give_same_age() {
        let mr = MergeRequestRecord::new(5, "2023-01-01T00:00:00.000Z", "2023-01-02T00:30:00.000Z");
        assert_eq!(mr.age_minutes().unwrap(), 1470.0);
    }

    #[test]
    fn test_minutes_to_days_floors() {
        assert_eq!(minutes_to_days(1439.9), 0);
        assert_eq!(minutes_to_days(1440.0), 1);
        assert_eq!(minutes_to_days(142_574.4), 99);
        assert_eq!(minutes_to_days(-1.0), -1);
    }

    #[test]
    fn test_cutoff_is_one_year_back() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let cutoff = cutoff_before(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2023, 2, 28, 12, 0, 0).unwrap());
        assert_eq!(format_timestamp(cutoff), "2023-02-28T12:00:00.000000Z");
    }

    #[test]
    fn test_query_validation() {
        let now = Utc::now();
        assert!(MergeRequestQuery::new("42", MergeRequestState::Merged, 0, now).is_err());
        assert!(MergeRequestQuery::new("42", MergeRequestState::Merged, 101, now).is_err());
        assert!(MergeRequestQuery::new("  ", MergeRequestState::Merged, 50, now).is_err());

        let query = MergeRequestQuery::merged_last_year("42", now).unwrap();
        assert_eq!(query.per_page, DEFAULT_PER_PAGE);
        assert_eq!(query.state, MergeRequestState::Merged);
        assert_eq!(query.record_range(1), (1, 50));
        assert_eq!(query.record_range(3), (101, 150));
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("merged".parse::<MergeRequestState>().unwrap(), MergeRequestState::Merged);
        assert_eq!("OPENED".parse::<MergeRequestState>().unwrap(), MergeRequestState::Opened);
        assert!("draft".parse::<MergeRequestState>().is_err());
    }

    #[test]
    fn test_record_ignores_unknown_fields() {
        let json = r#"{"id":7,"iid":3,"title":"x","created_at":"2023-01-01T00:00:00.000000Z","updated_at":"2023-01-01T01:00:00.000000Z"}"#;
        let mr: MergeRequestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(mr.iid, Some(3));
        assert_eq!(mr.age_minutes().unwrap(), 60.0);
    }
}
