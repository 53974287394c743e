//! Paged task listings.
//!
//! Parameter errors are returned to the caller. Store failures are logged and
//! degrade to an empty page, so a broken listing never takes the rest of the
//! dashboard down with it. A degraded page still carries the failure in
//! [`TaskPage::error`], so stateful consumers can keep what they already show.

use crate::context::RequestContext;
use crate::error::{DashboardError, DashboardResult};
use crate::query::{
    DateRangeParams, TaskQuery, ViewParams, build_checklist_history_query,
    build_checklist_pending_query, build_date_range_count_query, build_date_range_query,
    build_delegation_pending_query, build_view_count_query, build_view_query,
};
use crate::store::TaskStore;
use crate::types::TaskRecord;
use serde::Serialize;
use tracing::{debug, warn};

/// One page of rows plus the exact number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<TaskRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// Why the rows or the count could not be read, if either failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskPage {
    pub fn has_more(&self) -> bool {
        (self.page as u64).saturating_mul(self.page_size as u64) < self.total
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Rows and total for [`PagedState::commit`](crate::state::PagedState::commit).
    /// A degraded page becomes an error so the state keeps its prior rows.
    pub fn into_result(self) -> DashboardResult<(Vec<TaskRecord>, u64)> {
        match self.error {
            Some(reason) => Err(DashboardError::QueryFailed { reason }),
            None => Ok((self.tasks, self.total)),
        }
    }
}

fn failure_reason(err: &DashboardError) -> String {
    match err {
        DashboardError::QueryFailed { reason } => reason.clone(),
        other => other.to_string(),
    }
}

async fn fetch_page(
    store: &dyn TaskStore,
    rows: &TaskQuery,
    count: &TaskQuery,
    page: u32,
    page_size: u32,
    label: &'static str,
) -> TaskPage {
    let (tasks, total) = tokio::join!(store.select(rows), store.count(count));
    let mut error = None;
    let tasks = tasks.unwrap_or_else(|e| {
        warn!(collection = %rows.collection, listing = label, error = %e, "task fetch failed");
        error = Some(failure_reason(&e));
        Vec::new()
    });
    let total = total.unwrap_or_else(|e| {
        warn!(collection = %count.collection, listing = label, error = %e, "task count failed");
        error.get_or_insert_with(|| failure_reason(&e));
        0
    });
    debug!(
        collection = %rows.collection,
        listing = label,
        page,
        rows = tasks.len(),
        total,
        "fetched task page"
    );
    TaskPage {
        tasks,
        total,
        page,
        page_size,
        error,
    }
}

/// A dashboard view page (recent, upcoming, overdue or all).
pub async fn fetch_view(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    params: &ViewParams,
) -> DashboardResult<TaskPage> {
    let rows = build_view_query(ctx, params)?;
    let count = build_view_count_query(ctx, params);
    Ok(fetch_page(store, &rows, &count, params.page, params.page_size, "view").await)
}

/// Exact row count for a dashboard view, zero on failure.
pub async fn count_view(store: &dyn TaskStore, ctx: &RequestContext, params: &ViewParams) -> u64 {
    let query = build_view_count_query(ctx, params);
    store.count(&query).await.unwrap_or_else(|e| {
        warn!(collection = %params.collection, view = ?params.view, error = %e, "view count failed");
        0
    })
}

/// Checklist rows in a date range with a status filter.
pub async fn fetch_date_range(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    params: &DateRangeParams,
) -> DashboardResult<TaskPage> {
    let rows = build_date_range_query(ctx, params)?;
    let count = build_date_range_count_query(ctx, params);
    Ok(fetch_page(store, &rows, &count, params.page, params.page_size, "date_range").await)
}

/// Count for a date-range listing, zero on failure.
pub async fn count_date_range(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    params: &DateRangeParams,
) -> u64 {
    let query = build_date_range_count_query(ctx, params);
    store.count(&query).await.unwrap_or_else(|e| {
        warn!(status = ?params.status, error = %e, "date range count failed");
        0
    })
}

/// Checklist rows awaiting submission, oldest first.
pub async fn fetch_checklist_pending(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> DashboardResult<TaskPage> {
    let rows = build_checklist_pending_query(ctx, search, page, page_size)?;
    let count = rows.unpaged();
    Ok(fetch_page(store, &rows, &count, page, page_size, "checklist_pending").await)
}

/// Submitted checklist rows, newest first.
pub async fn fetch_checklist_history(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> DashboardResult<TaskPage> {
    let rows = build_checklist_history_query(ctx, search, page, page_size)?;
    let count = rows.unpaged();
    Ok(fetch_page(store, &rows, &count, page, page_size, "checklist_history").await)
}

/// Open and extended delegation rows, oldest first.
pub async fn fetch_delegation_pending(
    store: &dyn TaskStore,
    ctx: &RequestContext,
) -> Vec<TaskRecord> {
    let query = build_delegation_pending_query(ctx);
    store.select(&query).await.unwrap_or_else(|e| {
        warn!(error = %e, "delegation pending fetch failed");
        Vec::new()
    })
}
