//! Per-staff task rollup.
//!
//! The roster is the distinct set of assignee names visible to the caller, in
//! first-seen order, paged in memory. Counts for the page's staff come from a
//! single grouped request when the store can answer one, otherwise from one
//! request per staff member run concurrently.
//!
//! The roster and the per-staff counts use different filters: the roster
//! honours the dashboard department filter, the counts cover every task the
//! caller may see up to today. A staff member's totals can therefore include
//! rows outside the filtered roster.

use crate::context::RequestContext;
use crate::directory::total_users_count;
use crate::error::DashboardResult;
use crate::query::{
    build_staff_group_query, build_staff_names_query, build_staff_tasks_query, validate_page,
};
use crate::store::{StaffCounts, TaskStore};
use crate::types::{Collection, StaffSummary};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Domain used for synthesized staff email addresses.
pub const EMAIL_DOMAIN: &str = "example.com";

/// One page of the staff roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPage {
    pub staff: Vec<StaffSummary>,
    pub page: u32,
    pub page_size: u32,
    /// Distinct staff count, fetched on the first page only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_staff: Option<u64>,
    /// User directory size, fetched on the first page only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
}

fn slug(name: &str, separator: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(separator)
}

/// Stable identifier derived from a staff name.
pub fn staff_id(name: &str) -> String {
    slug(name, "-")
}

/// Placeholder email derived from a staff name.
pub fn staff_email(name: &str) -> String {
    format!("{}@{}", slug(name, "."), EMAIL_DOMAIN)
}

/// Rounded percentage of completed tasks, 0 when there are none.
pub fn progress(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

impl From<StaffCounts> for StaffSummary {
    fn from(counts: StaffCounts) -> Self {
        let completed = counts.completed.min(counts.total);
        StaffSummary {
            id: staff_id(&counts.name),
            email: staff_email(&counts.name),
            total_tasks: counts.total,
            completed_tasks: completed,
            pending_tasks: counts.total - completed,
            progress: progress(completed, counts.total),
            name: counts.name,
        }
    }
}

/// Drop repeats, keeping the first occurrence of each name.
pub fn dedupe_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn page_slice(names: &[String], page: u32, page_size: u32) -> &[String] {
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    if start >= names.len() {
        return &[];
    }
    let end = start.saturating_add(page_size as usize).min(names.len());
    &names[start..end]
}

async fn grouped_counts(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    names: &[String],
) -> Option<Vec<StaffSummary>> {
    let query = build_staff_group_query(ctx, collection, names);
    let grouped = match store.group_by_staff(&query).await {
        Ok(Some(grouped)) => grouped,
        Ok(None) => return None,
        Err(e) => {
            warn!(collection = %collection, error = %e, "grouped staff counts failed, falling back");
            return None;
        }
    };

    let mut by_name: HashMap<String, StaffCounts> = grouped
        .into_iter()
        .map(|c| (c.name.clone(), c))
        .collect();
    Some(
        names
            .iter()
            .map(|name| {
                by_name
                    .remove(name)
                    .unwrap_or_else(|| StaffCounts {
                        name: name.clone(),
                        total: 0,
                        completed: 0,
                    })
                    .into()
            })
            .collect(),
    )
}

async fn per_staff_counts(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    names: &[String],
) -> Vec<StaffSummary> {
    let done = collection.done_status();
    let fetches = names.iter().map(|name| async move {
        let query = build_staff_tasks_query(ctx, collection, name);
        match store.select(&query).await {
            Ok(rows) => Some(StaffCounts {
                name: name.clone(),
                total: rows.len() as u64,
                completed: rows
                    .iter()
                    .filter(|r| r.status.as_deref() == Some(done))
                    .count() as u64,
            }),
            Err(e) => {
                warn!(collection = %collection, staff = %name, error = %e, "staff task fetch failed");
                None
            }
        }
    });
    join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .map(StaffSummary::from)
        .collect()
}

async fn distinct_staff_count(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
) -> Option<u64> {
    let query = build_staff_names_query(ctx, collection, staff, department);
    match store.select_names(&query).await {
        Ok(names) => Some(names.into_iter().collect::<HashSet<_>>().len() as u64),
        Err(e) => {
            warn!(collection = %collection, error = %e, "staff count failed");
            None
        }
    }
}

async fn users_count(store: &dyn TaskStore) -> Option<u64> {
    match store.list_users().await {
        Ok(users) => Some(total_users_count(&users)),
        Err(e) => {
            warn!(error = %e, "user count failed");
            None
        }
    }
}

async fn roster_page(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
    page: u32,
    page_size: u32,
) -> Vec<StaffSummary> {
    let query = build_staff_names_query(ctx, collection, staff, department);
    let names = match store.select_names(&query).await {
        Ok(names) => dedupe_names(names),
        Err(e) => {
            warn!(collection = %collection, error = %e, "staff roster fetch failed");
            return Vec::new();
        }
    };

    let slice = page_slice(&names, page, page_size);
    if slice.is_empty() {
        return Vec::new();
    }
    match grouped_counts(store, ctx, collection, slice).await {
        Some(staff) => staff,
        None => per_staff_counts(store, ctx, collection, slice).await,
    }
}

/// Fetch one page of the staff rollup.
///
/// On page 1 the distinct staff count and user directory size are fetched
/// alongside the roster; each side count fails on its own.
pub async fn fetch_staff_page(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
    page: u32,
    page_size: u32,
) -> DashboardResult<StaffPage> {
    validate_page(page, page_size)?;

    let roster = roster_page(store, ctx, collection, staff, department, page, page_size);
    let (staff_rows, total_staff, total_users) = if page == 1 {
        tokio::join!(
            roster,
            distinct_staff_count(store, ctx, collection, staff, department),
            users_count(store),
        )
    } else {
        (roster.await, None, None)
    };

    debug!(
        collection = %collection,
        page,
        staff = staff_rows.len(),
        ?total_staff,
        "fetched staff page"
    );
    Ok(StaffPage {
        staff: staff_rows,
        page,
        page_size,
        total_staff,
        total_users,
    })
}

/// Accumulates staff pages for an infinite-scroll consumer.
#[derive(Debug, Clone, Default)]
pub struct StaffRoster {
    pub staff: Vec<StaffSummary>,
    pub total_staff: Option<u64>,
    pub total_users: Option<u64>,
    next_page: u32,
    in_flight: bool,
    exhausted: bool,
}

impl StaffRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next page to fetch, or `None` while a fetch is in flight or
    /// after the roster is complete.
    pub fn begin_next(&mut self) -> Option<u32> {
        if self.in_flight || self.exhausted {
            return None;
        }
        self.in_flight = true;
        Some(self.next_page.max(1))
    }

    /// Merge a fetched page.
    ///
    /// The roster ends when a page comes back empty or the accumulated staff
    /// reach the reported distinct staff count.
    pub fn finish(&mut self, page: StaffPage) {
        self.in_flight = false;
        if page.total_staff.is_some() {
            self.total_staff = page.total_staff;
        }
        if page.total_users.is_some() {
            self.total_users = page.total_users;
        }
        if page.staff.is_empty() {
            self.exhausted = true;
            return;
        }
        self.next_page = page.page + 1;
        self.staff.extend(page.staff);
        if let Some(total) = self.total_staff {
            if self.staff.len() as u64 >= total {
                self.exhausted = true;
            }
        }
    }

    /// Release the in-flight claim after a failed fetch.
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_emails_collapse_whitespace() {
        assert_eq!(staff_id("Asha  Rani"), "asha-rani");
        assert_eq!(staff_email("Asha  Rani"), "asha.rani@example.com");
        assert_eq!(staff_email(" Ravi "), "ravi@example.com");
    }

    #[test]
    fn progress_rounds() {
        assert_eq!(progress(1, 3), 33);
        assert_eq!(progress(2, 3), 67);
        assert_eq!(progress(0, 0), 0);
    }

    #[test]
    fn summary_counts_add_up() {
        let summary = StaffSummary::from(StaffCounts {
            name: "Ravi".into(),
            total: 7,
            completed: 3,
        });
        assert_eq!(summary.completed_tasks + summary.pending_tasks, summary.total_tasks);
        assert_eq!(summary.progress, 43);
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let names = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedupe_names(names), vec!["b", "a", "c"]);
    }

    #[test]
    fn slices_are_one_based() {
        let names: Vec<String> = (1..=5).map(|i| format!("s{}", i)).collect();
        assert_eq!(page_slice(&names, 1, 2), &names[0..2]);
        assert_eq!(page_slice(&names, 3, 2), &names[4..5]);
        assert!(page_slice(&names, 4, 2).is_empty());
    }

    #[test]
    fn roster_stops_at_reported_total() {
        let mut roster = StaffRoster::new();
        assert_eq!(roster.begin_next(), Some(1));
        assert_eq!(roster.begin_next(), None);

        let entry = |name: &str| StaffSummary::from(StaffCounts {
            name: name.into(),
            total: 1,
            completed: 0,
        });
        roster.finish(StaffPage {
            staff: vec![entry("a"), entry("b")],
            page: 1,
            page_size: 2,
            total_staff: Some(3),
            total_users: Some(10),
        });
        assert!(roster.has_more());
        assert_eq!(roster.begin_next(), Some(2));
        roster.finish(StaffPage {
            staff: vec![entry("c")],
            page: 2,
            page_size: 2,
            total_staff: None,
            total_users: None,
        });
        assert!(!roster.has_more());
        assert_eq!(roster.begin_next(), None);
        assert_eq!(roster.total_users, Some(10));
    }
}
