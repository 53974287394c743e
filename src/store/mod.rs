//! Task store abstraction.
//!
//! [`TaskStore`] is the boundary between the dashboard layer and persistence.
//! Reads take a [`TaskQuery`]; writes take the lifecycle inputs from
//! [`crate::types`]. Implementations:
//!
//! - [`Database`](crate::db::Database): SQLite via rusqlite.
//! - [`MemoryStore`](memory::MemoryStore): in-process rows, with fault
//!   injection for exercising partial-failure paths.

pub mod memory;

use crate::error::DashboardResult;
use crate::query::TaskQuery;
use crate::types::{
    ChecklistSubmission, Collection, DelegationSubmission, NewTask, TaskRecord, UserAccount,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Grouped per-assignee counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffCounts {
    pub name: String,
    pub total: u64,
    /// Rows whose status equals the collection's done status.
    pub completed: u64,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Rows matching the query, ordered and windowed as it asks.
    async fn select(&self, query: &TaskQuery) -> DashboardResult<Vec<TaskRecord>>;

    /// Exact number of rows matching the query's filters (window ignored).
    async fn count(&self, query: &TaskQuery) -> DashboardResult<u64>;

    /// Assignee names of every matching row, duplicates included.
    async fn select_names(&self, query: &TaskQuery) -> DashboardResult<Vec<String>>;

    /// Per-assignee counts for matching rows in a single request.
    ///
    /// `Ok(None)` means the store has no grouping primitive and callers must
    /// fall back to one [`select`](TaskStore::select) per assignee.
    async fn group_by_staff(&self, _query: &TaskQuery) -> DashboardResult<Option<Vec<StaffCounts>>> {
        Ok(None)
    }

    async fn list_users(&self) -> DashboardResult<Vec<UserAccount>>;

    /// Insert assigned tasks into one collection, returning the stored rows.
    async fn insert_tasks(
        &self,
        collection: Collection,
        tasks: &[NewTask],
    ) -> DashboardResult<Vec<TaskRecord>>;

    /// Apply checklist submissions atomically.
    async fn submit_checklist(
        &self,
        items: &[ChecklistSubmission],
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<Vec<TaskRecord>>;

    /// Record a delegation outcome and update the task.
    async fn submit_delegation(
        &self,
        item: &DelegationSubmission,
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<TaskRecord>;

    /// Set the administrative done marker on checklist rows.
    async fn mark_admin_done(&self, task_ids: &[i64]) -> DashboardResult<u64>;
}
