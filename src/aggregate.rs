//! Dashboard counts and completion rates.
//!
//! The four summary counts are independent requests. They run concurrently and
//! settle individually: a failing count is logged, reported as zero and named
//! in [`DashboardSummary::failed`] while the others keep their values.

use crate::context::RequestContext;
use crate::error::DashboardResult;
use crate::query::{DateRangeParams, build_date_range_count_query, build_summary_queries};
use crate::store::TaskStore;
use crate::types::{CHECKLIST_DONE, Collection, TaskRecord, start_of_day};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

/// Which of the summary counts a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountKind {
    Total,
    Completed,
    Pending,
    Overdue,
}

impl CountKind {
    const ORDER: [CountKind; 4] = [
        CountKind::Total,
        CountKind::Completed,
        CountKind::Pending,
        CountKind::Overdue,
    ];
}

/// Headline numbers for one dashboard scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub overdue_tasks: u64,
    /// Percentage with one decimal place.
    pub completion_rate: f64,
    /// Counts that could not be fetched and are reported as zero.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<CountKind>,
}

/// `completed / total` as a percentage rounded to one decimal place.
///
/// Zero when there are no tasks.
pub fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = completed as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Fetch total, completed, pending and overdue counts concurrently.
pub async fn summarize(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
) -> DashboardSummary {
    let [total, completed, pending, overdue] =
        build_summary_queries(ctx, collection, staff, department);

    let results = tokio::join!(
        store.count(&total),
        store.count(&completed),
        store.count(&pending),
        store.count(&overdue),
    );
    let results = [results.0, results.1, results.2, results.3];

    let mut values = [0u64; 4];
    let mut failed = Vec::new();
    for ((slot, result), kind) in values.iter_mut().zip(results).zip(CountKind::ORDER) {
        match result {
            Ok(n) => *slot = n,
            Err(e) => {
                warn!(collection = %collection, count = ?kind, error = %e, "dashboard count failed");
                failed.push(kind);
            }
        }
    }

    let [total_tasks, completed_tasks, pending_tasks, overdue_tasks] = values;
    debug!(
        collection = %collection,
        total_tasks, completed_tasks, pending_tasks, overdue_tasks,
        "dashboard summary"
    );
    DashboardSummary {
        total_tasks,
        completed_tasks,
        pending_tasks,
        overdue_tasks,
        completion_rate: completion_rate(completed_tasks, total_tasks),
        failed,
    }
}

/// Checklist statistics over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub overdue_tasks: u64,
    pub completion_rate: f64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRangeStats {
    /// Classify already-fetched rows relative to `today`.
    pub fn from_rows(
        rows: &[TaskRecord],
        today: NaiveDate,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        let today_start = start_of_day(today);
        let mut completed = 0;
        let mut pending = 0;
        let mut overdue = 0;
        for row in rows {
            if row.status.as_deref() == Some(CHECKLIST_DONE) {
                completed += 1;
            } else if row.task_start_date >= today_start {
                pending += 1;
            } else if row.submission_date.is_none() {
                overdue += 1;
            }
        }
        let total = rows.len() as u64;
        Self {
            total_tasks: total,
            completed_tasks: completed,
            pending_tasks: pending,
            overdue_tasks: overdue,
            completion_rate: completion_rate(completed, total),
            start,
            end,
        }
    }
}

/// Stats for every checklist row in the range, ignoring the status filter.
pub async fn date_range_stats(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    params: &DateRangeParams,
) -> DashboardResult<DateRangeStats> {
    let query = build_date_range_count_query(
        ctx,
        &DateRangeParams {
            status: Default::default(),
            ..params.clone()
        },
    );
    let rows = store.select(&query).await?;
    Ok(DateRangeStats::from_rows(
        &rows,
        ctx.today,
        params.start,
        params.end,
    ))
}
