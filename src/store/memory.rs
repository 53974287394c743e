//! In-memory task store.
//!
//! Rows live in plain vectors behind a mutex and queries are evaluated with
//! [`TaskQuery::apply`]. Read faults can be injected per query so callers'
//! degradation paths can be exercised without a real backend.

use super::{StaffCounts, TaskStore};
use crate::error::{DashboardError, DashboardResult};
use crate::query::TaskQuery;
use crate::types::{
    ADMIN_DONE, ChecklistSubmission, Collection, DELEGATION_DONE, DELEGATION_EXTEND,
    DelegationOutcome, DelegationSubmission, NewTask, TaskRecord, UserAccount,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type FaultFn = Box<dyn Fn(&TaskQuery) -> bool + Send + Sync>;

#[derive(Default)]
struct Tables {
    checklist: Vec<TaskRecord>,
    delegation: Vec<TaskRecord>,
    users: Vec<UserAccount>,
    next_id: i64,
}

impl Tables {
    fn rows(&self, collection: Collection) -> &Vec<TaskRecord> {
        match collection {
            Collection::Checklist => &self.checklist,
            Collection::Delegation => &self.delegation,
        }
    }

    fn rows_mut(&mut self, collection: Collection) -> &mut Vec<TaskRecord> {
        match collection {
            Collection::Checklist => &mut self.checklist,
            Collection::Delegation => &mut self.delegation,
        }
    }
}

/// Store backed by in-process vectors.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Vec<FaultFn>>,
    fail_users: AtomicBool,
    grouping: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer [`TaskStore::group_by_staff`] instead of returning `None`.
    pub fn with_grouping(self) -> Self {
        self.grouping.store(true, Ordering::SeqCst);
        self
    }

    /// Seed rows as-is (ids are kept).
    pub fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = TaskRecord>) {
        if let Ok(mut tables) = self.tables.lock() {
            for row in rows {
                tables.next_id = tables.next_id.max(row.task_id);
                tables.rows_mut(collection).push(row);
            }
        }
    }

    pub fn seed_users(&self, users: impl IntoIterator<Item = UserAccount>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.users.extend(users);
        }
    }

    /// Fail every read whose query satisfies `predicate`.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TaskQuery) -> bool + Send + Sync + 'static,
    {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(Box::new(predicate));
        }
    }

    /// Drop every injected read failure.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Fail user-directory reads.
    pub fn fail_users(&self) {
        self.fail_users.store(true, Ordering::SeqCst);
    }

    /// Number of task reads served (including failed ones).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Snapshot of one collection.
    pub fn rows(&self, collection: Collection) -> Vec<TaskRecord> {
        self.tables
            .lock()
            .map(|t| t.rows(collection).clone())
            .unwrap_or_default()
    }

    fn tables(&self) -> DashboardResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| DashboardError::query("memory store lock poisoned"))
    }

    fn check_faults(&self, query: &TaskQuery) -> DashboardResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let faults = self
            .faults
            .lock()
            .map_err(|_| DashboardError::query("memory store lock poisoned"))?;
        if faults.iter().any(|f| f(query)) {
            return Err(DashboardError::query("injected read failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn select(&self, query: &TaskQuery) -> DashboardResult<Vec<TaskRecord>> {
        self.check_faults(query)?;
        let tables = self.tables()?;
        Ok(query.apply(tables.rows(query.collection)))
    }

    async fn count(&self, query: &TaskQuery) -> DashboardResult<u64> {
        self.check_faults(query)?;
        let tables = self.tables()?;
        let unpaged = query.unpaged();
        Ok(tables
            .rows(query.collection)
            .iter()
            .filter(|r| unpaged.matches(r))
            .count() as u64)
    }

    async fn select_names(&self, query: &TaskQuery) -> DashboardResult<Vec<String>> {
        self.check_faults(query)?;
        let tables = self.tables()?;
        Ok(query
            .unpaged()
            .apply(tables.rows(query.collection))
            .into_iter()
            .filter_map(|r| r.name)
            .collect())
    }

    async fn group_by_staff(&self, query: &TaskQuery) -> DashboardResult<Option<Vec<StaffCounts>>> {
        if !self.grouping.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.check_faults(query)?;
        let tables = self.tables()?;
        let done = query.collection.done_status();

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, StaffCounts> = HashMap::new();
        for row in query.unpaged().apply(tables.rows(query.collection)) {
            let Some(name) = row.name.clone() else {
                continue;
            };
            let entry = counts.entry(name.clone()).or_insert_with(|| {
                order.push(name.clone());
                StaffCounts {
                    name,
                    total: 0,
                    completed: 0,
                }
            });
            entry.total += 1;
            if row.status.as_deref() == Some(done) {
                entry.completed += 1;
            }
        }
        Ok(Some(
            order
                .into_iter()
                .filter_map(|name| counts.remove(&name))
                .collect(),
        ))
    }

    async fn list_users(&self) -> DashboardResult<Vec<UserAccount>> {
        if self.fail_users.load(Ordering::SeqCst) {
            return Err(DashboardError::query("injected user directory failure"));
        }
        Ok(self.tables()?.users.clone())
    }

    async fn insert_tasks(
        &self,
        collection: Collection,
        tasks: &[NewTask],
    ) -> DashboardResult<Vec<TaskRecord>> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DashboardError::write("memory store lock poisoned"))?;
        let mut inserted = Vec::with_capacity(tasks.len());
        for task in tasks {
            tables.next_id += 1;
            let mut record = TaskRecord::new(tables.next_id, &task.doer, task.due_date);
            record.department = Some(task.department.clone());
            record.given_by = Some(task.given_by.clone());
            record.task_description = Some(task.description.clone());
            record.frequency = Some(task.frequency.clone());
            record.enable_reminder = Some(yes_no(task.enable_reminders));
            record.require_attachment = Some(yes_no(task.require_attachment));
            tables.rows_mut(collection).push(record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn submit_checklist(
        &self,
        items: &[ChecklistSubmission],
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<Vec<TaskRecord>> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DashboardError::write("memory store lock poisoned"))?;
        let rows = tables.rows_mut(Collection::Checklist);
        if let Some(missing) = items
            .iter()
            .find(|i| !rows.iter().any(|r| r.task_id == i.task_id))
        {
            return Err(DashboardError::task_not_found(missing.task_id));
        }
        let mut updated = Vec::with_capacity(items.len());
        for item in items {
            if let Some(row) = rows.iter_mut().find(|r| r.task_id == item.task_id) {
                row.status = Some(item.status.clone());
                row.remark = item.remarks.clone();
                row.image = item.image.clone();
                row.submission_date = Some(submitted_at);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn submit_delegation(
        &self,
        item: &DelegationSubmission,
        submitted_at: NaiveDateTime,
    ) -> DashboardResult<TaskRecord> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DashboardError::write("memory store lock poisoned"))?;
        let row = tables
            .rows_mut(Collection::Delegation)
            .iter_mut()
            .find(|r| r.task_id == item.task_id)
            .ok_or_else(|| DashboardError::task_not_found(item.task_id))?;
        row.submission_date = Some(submitted_at);
        row.image = item.image_url.clone();
        row.remark = item.reason.clone();
        match &item.outcome {
            DelegationOutcome::Done => row.status = Some(DELEGATION_DONE.to_string()),
            DelegationOutcome::Extend {
                next_extend_date: Some(next),
            } => {
                row.status = Some(DELEGATION_EXTEND.to_string());
                row.planned_date = Some(*next);
            }
            DelegationOutcome::Extend {
                next_extend_date: None,
            } => {}
        }
        Ok(row.clone())
    }

    async fn mark_admin_done(&self, task_ids: &[i64]) -> DashboardResult<u64> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DashboardError::write("memory store lock poisoned"))?;
        let mut affected = 0;
        for row in tables.rows_mut(Collection::Checklist) {
            if task_ids.contains(&row.task_id) {
                row.admin_done = Some(ADMIN_DONE.to_string());
                affected += 1;
            }
        }
        Ok(affected)
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}
