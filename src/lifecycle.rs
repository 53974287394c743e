//! Task lifecycle writes: assign, submit and administrative mark-done.
//!
//! Unlike the read paths, writes propagate every failure to the caller.

use crate::context::RequestContext;
use crate::error::{DashboardError, DashboardResult};
use crate::store::TaskStore;
use crate::types::{
    ChecklistSubmission, Collection, DelegationOutcome, DelegationSubmission, NewTask, TaskRecord,
    now_utc,
};
use tracing::{info, warn};

fn require_text(field: &str, value: &str) -> DashboardResult<()> {
    if value.trim().is_empty() {
        return Err(DashboardError::invalid_value(field, "must not be empty"));
    }
    Ok(())
}

/// Insert assigned tasks. "one-time" tasks go to delegation, every other
/// frequency to checklist. Returns the stored rows, checklist first.
pub async fn assign_tasks(
    store: &dyn TaskStore,
    tasks: &[NewTask],
) -> DashboardResult<Vec<TaskRecord>> {
    if tasks.is_empty() {
        return Err(DashboardError::invalid_value("tasks", "nothing to assign"));
    }
    for task in tasks {
        require_text("doer", &task.doer)?;
        require_text("description", &task.description)?;
        require_text("frequency", &task.frequency)?;
    }

    let mut inserted = Vec::with_capacity(tasks.len());
    for collection in [Collection::Checklist, Collection::Delegation] {
        let batch: Vec<NewTask> = tasks
            .iter()
            .filter(|t| Collection::for_frequency(&t.frequency) == collection)
            .cloned()
            .collect();
        if batch.is_empty() {
            continue;
        }
        let rows = store.insert_tasks(collection, &batch).await?;
        info!(collection = %collection, count = rows.len(), "assigned tasks");
        inserted.extend(rows);
    }
    Ok(inserted)
}

/// Record checklist submissions; an unknown id rejects the whole batch.
pub async fn submit_checklist(
    store: &dyn TaskStore,
    items: &[ChecklistSubmission],
) -> DashboardResult<Vec<TaskRecord>> {
    if items.is_empty() {
        return Err(DashboardError::invalid_value("items", "nothing to submit"));
    }
    for item in items {
        require_text("status", &item.status)?;
    }
    let rows = store.submit_checklist(items, now_utc()).await?;
    info!(count = rows.len(), "checklist submitted");
    Ok(rows)
}

/// Record a delegation outcome.
pub async fn submit_delegation(
    store: &dyn TaskStore,
    item: &DelegationSubmission,
) -> DashboardResult<TaskRecord> {
    if let DelegationOutcome::Extend {
        next_extend_date: None,
    } = item.outcome
    {
        warn!(task_id = item.task_id, "extension submitted without a next date");
    }
    let row = store.submit_delegation(item, now_utc()).await?;
    info!(task_id = row.task_id, status = ?row.status, "delegation submitted");
    Ok(row)
}

/// Set the administrative done marker on checklist rows. Admin only.
pub async fn mark_done(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    task_ids: &[i64],
) -> DashboardResult<u64> {
    if !ctx.is_admin() {
        return Err(DashboardError::invalid_value(
            "role",
            "mark done requires the admin role",
        ));
    }
    if task_ids.is_empty() {
        return Err(DashboardError::invalid_value("task_ids", "no tasks selected"));
    }
    let affected = store.mark_admin_done(task_ids).await?;
    info!(requested = task_ids.len(), affected, "marked tasks done");
    Ok(affected)
}
