//! [`TaskStore`] over the SQLite database.

use super::Database;
use crate::error::{DashboardError, DashboardResult};
use crate::query::TaskQuery;
use crate::store::{StaffCounts, TaskStore};
use crate::types::{
    ChecklistSubmission, Collection, DelegationSubmission, NewTask, TaskRecord, UserAccount,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;

// Keep typed errors raised inside a transaction; everything else is a store failure.
fn read_failure(err: anyhow::Error) -> DashboardError {
    match err.downcast::<DashboardError>() {
        Ok(err) => err,
        Err(err) => DashboardError::query(format!("{:#}", err)),
    }
}

fn write_failure(err: anyhow::Error) -> DashboardError {
    match err.downcast::<DashboardError>() {
        Ok(err) => err,
        Err(err) => DashboardError::write(format!("{:#}", err)),
    }
}

#[async_trait]
impl TaskStore for Database {
    async fn select(&self, query: &TaskQuery) -> DashboardResult<Vec<TaskRecord>> {
        self.query_tasks(query).map_err(read_failure)
    }

    async fn count(&self, query: &TaskQuery) -> DashboardResult<u64> {
        self.count_tasks(query).map_err(read_failure)
    }

    async fn select_names(&self, query: &TaskQuery) -> DashboardResult<Vec<String>> {
        self.query_task_names(query).map_err(read_failure)
    }

    async fn group_by_staff(&self, query: &TaskQuery) -> DashboardResult<Option<Vec<StaffCounts>>> {
        self.group_tasks_by_staff(query)
            .map(Some)
            .map_err(read_failure)
    }

    async fn list_users(&self) -> DashboardResult<Vec<UserAccount>> {
        Database::list_users(self).map_err(read_failure)
    }

    async fn insert_tasks(
        &self,
        collection: Collection,
        tasks: &[NewTask],
    ) -> DashboardResult<Vec<TaskRecord>> {
        Database::insert_tasks(self, collection, tasks).map_err(write_failure)
    }

    async fn submit_checklist(
        &self,
        items: &[ChecklistSubmission],
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<Vec<TaskRecord>> {
        Database::submit_checklist(self, items, submitted_at).map_err(write_failure)
    }

    async fn submit_delegation(
        &self,
        item: &DelegationSubmission,
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<TaskRecord> {
        Database::submit_delegation(self, item, submitted_at).map_err(write_failure)
    }

    async fn mark_admin_done(&self, task_ids: &[i64]) -> DashboardResult<u64> {
        Database::mark_admin_done(self, task_ids).map_err(write_failure)
    }
}
