//! Core types for the dashboard layer.

use crate::error::DashboardError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status value marking a checklist task complete.
pub const CHECKLIST_DONE: &str = "Yes";
/// Status value marking a delegation task complete.
pub const DELEGATION_DONE: &str = "done";
/// Status value marking a delegation task as extended to a new date.
pub const DELEGATION_EXTEND: &str = "extend";
/// Value written by the administrative mark-done action.
pub const ADMIN_DONE: &str = "Done";

/// Filter value meaning "no restriction" for staff and department filters.
pub const FILTER_ALL: &str = "all";

/// Storage format for timestamps. Lexical order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A named set of task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Checklist,
    Delegation,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Checklist => "checklist",
            Collection::Delegation => "delegation",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Status value the staff rollup counts as completed.
    pub fn done_status(&self) -> &'static str {
        match self {
            Collection::Checklist => CHECKLIST_DONE,
            Collection::Delegation => DELEGATION_DONE,
        }
    }

    /// Collection an assigned task lands in, chosen by its frequency.
    pub fn for_frequency(frequency: &str) -> Self {
        if frequency.eq_ignore_ascii_case("one-time") {
            Collection::Delegation
        } else {
            Collection::Checklist
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checklist" => Ok(Collection::Checklist),
            "delegation" => Ok(Collection::Delegation),
            other => Err(DashboardError::invalid_value(
                "collection",
                format!("unknown collection '{}'", other),
            )),
        }
    }
}

/// Access scope of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Restricted to one's own records.
    User,
    /// Broadened to an allow-listed set of departments.
    Admin,
}

impl FromStr for Role {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DashboardError::invalid_value(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Predicate preset selecting a date/status window of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskView {
    #[default]
    Recent,
    Upcoming,
    Overdue,
    All,
}

impl FromStr for TaskView {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recent" => Ok(TaskView::Recent),
            "upcoming" => Ok(TaskView::Upcoming),
            "overdue" => Ok(TaskView::Overdue),
            "all" => Ok(TaskView::All),
            other => Err(DashboardError::invalid_value(
                "view",
                format!("unknown task view '{}'", other),
            )),
        }
    }
}

/// Status filter for date-range listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
    Overdue,
}

impl FromStr for StatusFilter {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            "overdue" => Ok(StatusFilter::Overdue),
            other => Err(DashboardError::invalid_value(
                "status",
                format!("unknown status filter '{}'", other),
            )),
        }
    }
}

/// Sort direction on the scheduled start column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A checklist or delegation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: i64,
    pub department: Option<String>,
    pub given_by: Option<String>,
    /// Assignee name.
    pub name: Option<String>,
    pub task_description: Option<String>,
    pub task_start_date: NaiveDateTime,
    pub submission_date: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub remark: Option<String>,
    pub image: Option<String>,
    pub frequency: Option<String>,
    pub enable_reminder: Option<String>,
    pub require_attachment: Option<String>,
    /// Checklist only.
    pub admin_done: Option<String>,
    /// Delegation only: the date an extension moved the task to.
    pub planned_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

impl TaskRecord {
    /// Minimal record used when seeding stores.
    pub fn new(task_id: i64, name: &str, task_start_date: NaiveDateTime) -> Self {
        Self {
            task_id,
            department: None,
            given_by: None,
            name: Some(name.to_string()),
            task_description: None,
            task_start_date,
            submission_date: None,
            status: None,
            remark: None,
            image: None,
            frequency: None,
            enable_reminder: None,
            require_attachment: None,
            admin_done: None,
            planned_date: None,
            created_at: None,
        }
    }
}

/// Per-staff rollup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub progress: u8,
}

/// A dashboard login account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub user_name: Option<String>,
    pub role: Option<String>,
    /// Comma-separated department allow-list.
    pub user_access: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
}

/// Input for the assign action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub department: String,
    pub given_by: String,
    pub doer: String,
    pub description: String,
    pub due_date: NaiveDateTime,
    pub frequency: String,
    #[serde(default)]
    pub enable_reminders: bool,
    #[serde(default)]
    pub require_attachment: bool,
}

/// Input for the checklist submit action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistSubmission {
    pub task_id: i64,
    pub status: String,
    pub remarks: Option<String>,
    pub image: Option<String>,
}

/// Outcome recorded by a delegation submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DelegationOutcome {
    Done,
    Extend { next_extend_date: Option<NaiveDateTime> },
}

/// Input for the delegation submit action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationSubmission {
    pub task_id: i64,
    #[serde(flatten)]
    pub outcome: DelegationOutcome,
    pub reason: Option<String>,
    pub image_url: Option<String>,
}

/// Start of the given day.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last whole second of the given day (23:59:59).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

/// Current UTC time truncated to whole seconds.
pub fn now_utc() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Format a timestamp in storage format.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse the timestamp shapes the task tables contain.
///
/// Accepts RFC 3339 (offset dropped after conversion to UTC), `T` or space
/// separated local times with or without seconds/fractions, and bare dates.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    const FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}
