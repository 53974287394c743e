//! Task reads and lifecycle writes.

use super::sql::{Params, order_and_window, param_refs, where_clause};
use super::Database;
use crate::error::DashboardError;
use crate::query::TaskQuery;
use crate::store::StaffCounts;
use crate::types::{
    ADMIN_DONE, ChecklistSubmission, Collection, DELEGATION_DONE, DELEGATION_EXTEND,
    DelegationOutcome, DelegationSubmission, NewTask, TaskRecord, format_timestamp,
    parse_timestamp,
};
use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str = "task_id, department, given_by, name, task_description, \
     task_start_date, submission_date, status, remark, image, frequency, enable_reminder, \
     require_attachment, admin_done, planned_date, created_at";

fn get_timestamp(row: &Row, idx: &str) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                format!("unparseable timestamp in {}: {}", idx, s).into(),
            )
        }),
    }
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    let task_start_date = get_timestamp(row, "task_start_date")?.ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Null,
            "task_start_date is NULL".into(),
        )
    })?;

    Ok(TaskRecord {
        task_id: row.get("task_id")?,
        department: row.get("department")?,
        given_by: row.get("given_by")?,
        name: row.get("name")?,
        task_description: row.get("task_description")?,
        task_start_date,
        submission_date: get_timestamp(row, "submission_date")?,
        status: row.get("status")?,
        remark: row.get("remark")?,
        image: row.get("image")?,
        frequency: row.get("frequency")?,
        enable_reminder: row.get("enable_reminder")?,
        require_attachment: row.get("require_attachment")?,
        admin_done: row.get("admin_done")?,
        planned_date: get_timestamp(row, "planned_date")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn get_task(conn: &Connection, collection: Collection, task_id: i64) -> Result<Option<TaskRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE task_id = ?1",
        TASK_COLUMNS,
        collection.table()
    );
    Ok(conn
        .query_row(&sql, params![task_id], parse_task_row)
        .optional()?)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

impl Database {
    /// Rows matching a query.
    pub fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskRecord>> {
        self.with_conn(|conn| {
            let mut params = Params::new();
            let sql = format!(
                "SELECT {} FROM {}{}{}",
                TASK_COLUMNS,
                query.collection.table(),
                where_clause(query, &mut params),
                order_and_window(query),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(param_refs(&params).as_slice(), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Exact count for a query's filters.
    pub fn count_tasks(&self, query: &TaskQuery) -> Result<u64> {
        self.with_conn(|conn| {
            let mut params = Params::new();
            let sql = format!(
                "SELECT COUNT(*) FROM {}{}",
                query.collection.table(),
                where_clause(query, &mut params),
            );
            let count: i64 =
                conn.query_row(&sql, param_refs(&params).as_slice(), |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }

    /// Assignee name column for matching rows, NULLs skipped.
    pub fn query_task_names(&self, query: &TaskQuery) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut params = Params::new();
            let sql = format!(
                "SELECT name FROM {}{} ORDER BY task_id ASC",
                query.collection.table(),
                where_clause(query, &mut params),
            );
            let mut stmt = conn.prepare(&sql)?;
            let names = stmt
                .query_map(param_refs(&params).as_slice(), |row| {
                    row.get::<_, Option<String>>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names.into_iter().flatten().collect())
        })
    }

    /// Per-assignee totals and completions in one grouped query.
    pub fn group_tasks_by_staff(&self, query: &TaskQuery) -> Result<Vec<StaffCounts>> {
        self.with_conn(|conn| {
            let mut params = Params::new();
            params.push(Box::new(query.collection.done_status().to_string()));
            let sql = format!(
                "SELECT name, COUNT(*), COALESCE(SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END), 0)
                 FROM {}{} AND name IS NOT NULL
                 GROUP BY name
                 ORDER BY MIN(task_id) ASC",
                query.collection.table(),
                grouped_where(query, &mut params),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(param_refs(&params).as_slice(), |row| {
                    let name: String = row.get(0)?;
                    let total: i64 = row.get(1)?;
                    let completed: i64 = row.get(2)?;
                    Ok(StaffCounts {
                        name,
                        total: total.max(0) as u64,
                        completed: completed.max(0) as u64,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Insert assigned tasks in one transaction.
    pub fn insert_tasks(&self, collection: Collection, tasks: &[NewTask]) -> Result<Vec<TaskRecord>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(tasks.len());
            {
                let sql = format!(
                    "INSERT INTO {} (department, given_by, name, task_description, task_start_date,
                        frequency, enable_reminder, require_attachment)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    collection.table()
                );
                let mut stmt = tx.prepare(&sql)?;
                for task in tasks {
                    stmt.execute(params![
                        task.department,
                        task.given_by,
                        task.doer,
                        task.description,
                        format_timestamp(&task.due_date),
                        task.frequency,
                        yes_no(task.enable_reminders),
                        yes_no(task.require_attachment),
                    ])?;
                    ids.push(tx.last_insert_rowid());
                }
            }
            let mut inserted = Vec::with_capacity(ids.len());
            for id in ids {
                let row = get_task(&tx, collection, id)?
                    .ok_or_else(|| anyhow!("inserted task {} vanished", id))?;
                inserted.push(row);
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    /// Apply checklist submissions; any unknown task id aborts the batch.
    pub fn submit_checklist(
        &self,
        items: &[ChecklistSubmission],
        submitted_at: NaiveDateTime,
    ) -> Result<Vec<TaskRecord>> {
        let submitted_at = format_timestamp(&submitted_at);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut updated = Vec::with_capacity(items.len());
            for item in items {
                let rows = tx.execute(
                    "UPDATE checklist
                     SET status = ?1, remark = ?2, image = ?3, submission_date = ?4
                     WHERE task_id = ?5",
                    params![item.status, item.remarks, item.image, submitted_at, item.task_id],
                )?;
                if rows == 0 {
                    return Err(DashboardError::task_not_found(item.task_id).into());
                }
                if let Some(row) = get_task(&tx, Collection::Checklist, item.task_id)? {
                    updated.push(row);
                }
            }
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Record a delegation outcome in `delegation_done` and update the task.
    pub fn submit_delegation(
        &self,
        item: &DelegationSubmission,
        submitted_at: NaiveDateTime,
    ) -> Result<TaskRecord> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let task = get_task(&tx, Collection::Delegation, item.task_id)?
                .ok_or_else(|| DashboardError::task_not_found(item.task_id))?;

            let (status, next_extend_date) = match &item.outcome {
                DelegationOutcome::Done => (DELEGATION_DONE, None),
                DelegationOutcome::Extend { next_extend_date } => {
                    (DELEGATION_EXTEND, next_extend_date.as_ref().map(format_timestamp))
                }
            };
            let submitted = format_timestamp(&submitted_at);

            tx.execute(
                "INSERT INTO delegation_done
                    (task_id, status, next_extend_date, reason, name, task_description,
                     given_by, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    item.task_id,
                    status,
                    next_extend_date,
                    item.reason.clone().unwrap_or_default(),
                    task.name,
                    task.task_description,
                    task.given_by,
                    item.image_url,
                    submitted,
                ],
            )?;

            tx.execute(
                "UPDATE delegation
                 SET submission_date = ?1, image = ?2, remark = ?3
                 WHERE task_id = ?4",
                params![submitted, item.image_url, item.reason, item.task_id],
            )?;
            match (&item.outcome, &next_extend_date) {
                (DelegationOutcome::Done, _) => {
                    tx.execute(
                        "UPDATE delegation SET status = ?1 WHERE task_id = ?2",
                        params![DELEGATION_DONE, item.task_id],
                    )?;
                }
                (DelegationOutcome::Extend { .. }, Some(next)) => {
                    tx.execute(
                        "UPDATE delegation SET status = ?1, planned_date = ?2 WHERE task_id = ?3",
                        params![DELEGATION_EXTEND, next, item.task_id],
                    )?;
                }
                // An extension without a date records the submission only.
                (DelegationOutcome::Extend { .. }, None) => {}
            }

            let updated = get_task(&tx, Collection::Delegation, item.task_id)?
                .ok_or_else(|| DashboardError::task_not_found(item.task_id))?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Set `admin_done` on checklist rows; returns rows touched.
    pub fn mark_admin_done(&self, task_ids: &[i64]) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut affected = 0u64;
            for id in task_ids {
                affected += tx.execute(
                    "UPDATE checklist SET admin_done = ?1 WHERE task_id = ?2",
                    params![ADMIN_DONE, id],
                )? as u64;
            }
            tx.commit()?;
            Ok(affected)
        })
    }

    /// Number of `delegation_done` entries for a task.
    pub fn delegation_history_len(&self, task_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM delegation_done WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}

/// WHERE clause that always has a leading predicate so callers can append
/// `AND ...`. Parameter numbering continues after any already pushed.
fn grouped_where(query: &TaskQuery, params: &mut Params) -> String {
    let clause = where_clause(query, params);
    if clause.is_empty() {
        " WHERE 1=1".to_string()
    } else {
        clause
    }
}
