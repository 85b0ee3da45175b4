//! Merge request age aggregator
//!
//! Probe the page count, fetch every page concurrently, reduce each record to
//! its age in minutes, and report the 99th percentile in whole days.
//! Any failure aborts the whole aggregation; partial results are discarded.

use crate::application::stats::percentile;
use crate::domain::merge_request::minutes_to_days;
use crate::domain::MergeRequestQuery;
use crate::error::Result;
use crate::port::MergeRequestSource;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, Instrument};

/// Percentile reported by default
pub const AGE_PERCENTILE: f64 = 99.0;

/// Aggregated result
#[derive(Debug, Clone, PartialEq)]
pub struct AgeReport {
    pub pages: u32,
    pub records: usize,
    pub percentile: f64,
    pub percentile_minutes: f64,
    pub percentile_days: i64,
}

/// Fan-out/fan-in over the merge request pages of one group
pub struct MergeRequestAgeAggregator {
    source: Arc<dyn MergeRequestSource>,
    percentile: f64,
}

impl MergeRequestAgeAggregator {
    pub fn new(source: Arc<dyn MergeRequestSource>) -> Self {
        Self {
            source,
            percentile: AGE_PERCENTILE,
        }
    }

    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    /// Probe, fetch all pages, aggregate
    ///
    /// # Errors
    /// - AppError::Fetch if the probe or any page fetch fails
    /// - AppError::Domain(InvalidTimestamp) for a malformed record
    /// - AppError::Domain(EmptyInput) when there are no records at all
    pub async fn run(&self, query: &MergeRequestQuery) -> Result<AgeReport> {
        info!(
            group_id = %query.group_id,
            created_after = %query.created_after_param(),
            "Checking all merge requests created after {}",
            query.created_after_param()
        );

        let pages = self.source.page_count(query).await?;
        debug!(pages, "There are {} pages", pages);

        let ages = self.collect_ages(query, pages).await?;
        let minutes = percentile(&ages, self.percentile)?;
        let report = AgeReport {
            pages,
            records: ages.len(),
            percentile: self.percentile,
            percentile_minutes: minutes,
            percentile_days: minutes_to_days(minutes),
        };

        info!(
            records = report.records,
            days = report.percentile_days,
            "{}% of total {} MRs took {} days to close",
            report.percentile,
            report.records,
            report.percentile_days
        );
        Ok(report)
    }

    /// Fetch pages `1..=pages` concurrently and flatten their ages in page order
    ///
    /// The first failing page aborts every fetch still in flight.
    pub async fn collect_ages(&self, query: &MergeRequestQuery, pages: u32) -> Result<Vec<f64>> {
        let mut fetches = JoinSet::new();
        for page in 1..=pages {
            let source = Arc::clone(&self.source);
            let query = query.clone();
            fetches.spawn(
                async move { (page, Self::page_ages(source.as_ref(), &query, page).await) }
                    .instrument(info_span!("page_fetch", page)),
            );
        }

        let mut slots: Vec<Option<Vec<f64>>> = vec![None; pages as usize];
        while let Some(joined) = fetches.join_next().await {
            let (page, result) = joined?;
            match result {
                Ok(ages) => slots[(page - 1) as usize] = Some(ages),
                Err(e) => {
                    fetches.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(slots.into_iter().flatten().flatten().collect())
    }

    /// Fetch one page and reduce each record to its age in minutes
    async fn page_ages(
        source: &dyn MergeRequestSource,
        query: &MergeRequestQuery,
        page: u32,
    ) -> Result<Vec<f64>> {
        let (first, last) = query.record_range(page);
        debug!(page, "Fetching MRs from {} to {}", first, last);

        let records = source.fetch_page(query, page).await?;
        let ages = records
            .iter()
            .map(|mr| mr.age_minutes())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ages)
    }
}
