//! Store-neutral task queries.
//!
//! A [`TaskQuery`] is a collection plus a conjunction of [`Filter`] predicates,
//! an optional ordering on the scheduled start and an optional offset/limit
//! window. The SQLite store renders it to SQL; the in-memory store evaluates it
//! with [`TaskQuery::matches`]. Both follow SQL null semantics: a comparison
//! against an absent column is false.

pub mod builder;

pub use builder::*;

use crate::types::{Collection, SortOrder, TaskRecord};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Filterable task columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    TaskId,
    Name,
    Department,
    GivenBy,
    Description,
    TaskStartDate,
    SubmissionDate,
    Status,
    AdminDone,
}

impl Column {
    /// SQL column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::TaskId => "task_id",
            Column::Name => "name",
            Column::Department => "department",
            Column::GivenBy => "given_by",
            Column::Description => "task_description",
            Column::TaskStartDate => "task_start_date",
            Column::SubmissionDate => "submission_date",
            Column::Status => "status",
            Column::AdminDone => "admin_done",
        }
    }

    /// Whether the column holds a timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Column::TaskStartDate | Column::SubmissionDate)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Time(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

/// A single predicate. A query's filters are AND-ed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Column, Value),
    Neq(Column, Value),
    Gt(Column, Value),
    Gte(Column, Value),
    Lt(Column, Value),
    Lte(Column, Value),
    In(Column, Vec<String>),
    IsNull(Column),
    NotNull(Column),
    /// Substring match, case-insensitive for ASCII letters only.
    ILike(Column, String),
    Or(Vec<Filter>),
}

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: u64,
    pub limit: u64,
}

impl PageRange {
    /// Window for a 1-based page number.
    pub fn for_page(page: u32, page_size: u32) -> Self {
        let page = page.max(1) as u64;
        let limit = page_size as u64;
        Self {
            offset: (page - 1) * limit,
            limit,
        }
    }
}

/// A read request against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order: Option<SortOrder>,
    pub range: Option<PageRange>,
}

impl TaskQuery {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order: None,
            range: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by_start(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.range = Some(PageRange::for_page(page, page_size));
        self
    }

    /// Same predicates with no ordering or window, for exact counts.
    pub fn unpaged(&self) -> Self {
        Self {
            collection: self.collection,
            filters: self.filters.clone(),
            order: None,
            range: None,
        }
    }

    /// Whether a record satisfies every filter.
    pub fn matches(&self, record: &TaskRecord) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Evaluate the full query over an in-memory row set.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<TaskRecord>
    where
        I: IntoIterator<Item = &'a TaskRecord>,
    {
        let mut out: Vec<TaskRecord> = rows
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        match self.order {
            Some(SortOrder::Asc) => out.sort_by(|a, b| a.task_start_date.cmp(&b.task_start_date)),
            Some(SortOrder::Desc) => out.sort_by(|a, b| b.task_start_date.cmp(&a.task_start_date)),
            None => {}
        }
        if let Some(range) = self.range {
            out = out
                .into_iter()
                .skip(range.offset as usize)
                .take(range.limit as usize)
                .collect();
        }
        out
    }
}

/// A column value borrowed from a record.
enum Field<'a> {
    Text(&'a str),
    Time(NaiveDateTime),
    Int(i64),
}

fn field<'a>(record: &'a TaskRecord, column: Column) -> Option<Field<'a>> {
    match column {
        Column::TaskId => Some(Field::Int(record.task_id)),
        Column::Name => record.name.as_deref().map(Field::Text),
        Column::Department => record.department.as_deref().map(Field::Text),
        Column::GivenBy => record.given_by.as_deref().map(Field::Text),
        Column::Description => record.task_description.as_deref().map(Field::Text),
        Column::TaskStartDate => Some(Field::Time(record.task_start_date)),
        Column::SubmissionDate => record.submission_date.map(Field::Time),
        Column::Status => record.status.as_deref().map(Field::Text),
        Column::AdminDone => record.admin_done.as_deref().map(Field::Text),
    }
}

fn compare(field: &Field<'_>, value: &Value) -> Option<Ordering> {
    match (field, value) {
        (Field::Text(a), Value::Text(b)) => Some((*a).cmp(b.as_str())),
        (Field::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Field::Time(a), Value::Text(b)) => {
            crate::types::parse_timestamp(b).map(|b| a.cmp(&b))
        }
        (Field::Text(a), Value::Time(b)) => {
            crate::types::parse_timestamp(a).map(|a| a.cmp(b))
        }
        (Field::Int(a), Value::Text(b)) => b.trim().parse::<i64>().ok().map(|b| a.cmp(&b)),
        (Field::Int(_), Value::Time(_)) => None,
    }
}

fn field_text(field: &Field<'_>) -> String {
    match field {
        Field::Text(s) => s.to_string(),
        Field::Time(t) => crate::types::format_timestamp(t),
        Field::Int(i) => i.to_string(),
    }
}

impl Filter {
    /// Evaluate against a record with SQL null semantics.
    pub fn matches(&self, record: &TaskRecord) -> bool {
        let cmp = |column: Column, value: &Value, ok: fn(Ordering) -> bool| {
            field(record, column)
                .and_then(|f| compare(&f, value))
                .map(ok)
                .unwrap_or(false)
        };

        match self {
            Filter::Eq(c, v) => cmp(*c, v, |o| o == Ordering::Equal),
            Filter::Neq(c, v) => cmp(*c, v, |o| o != Ordering::Equal),
            Filter::Gt(c, v) => cmp(*c, v, |o| o == Ordering::Greater),
            Filter::Gte(c, v) => cmp(*c, v, |o| o != Ordering::Less),
            Filter::Lt(c, v) => cmp(*c, v, |o| o == Ordering::Less),
            Filter::Lte(c, v) => cmp(*c, v, |o| o != Ordering::Greater),
            Filter::In(c, set) => field(record, *c)
                .map(|f| {
                    let text = field_text(&f);
                    set.iter().any(|s| *s == text)
                })
                .unwrap_or(false),
            Filter::IsNull(c) => field(record, *c).is_none(),
            Filter::NotNull(c) => field(record, *c).is_some(),
            // ASCII-only folding, like SQLite's LOWER()
            Filter::ILike(c, needle) => field(record, *c)
                .map(|f| {
                    field_text(&f)
                        .to_ascii_lowercase()
                        .contains(&needle.to_ascii_lowercase())
                })
                .unwrap_or(false),
            Filter::Or(any) => any.iter().any(|f| f.matches(record)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;

    fn row(id: i64, name: &str, start: &str) -> TaskRecord {
        TaskRecord::new(id, name, parse_timestamp(start).unwrap())
    }

    #[test]
    fn comparisons_on_null_are_false() {
        let r = row(1, "X", "2025-06-10T09:00");
        assert!(!Filter::Neq(Column::Status, Value::text("Yes")).matches(&r));
        assert!(!Filter::Eq(Column::Status, Value::text("Yes")).matches(&r));
        assert!(Filter::IsNull(Column::Status).matches(&r));
        let either = Filter::Or(vec![
            Filter::IsNull(Column::Status),
            Filter::Neq(Column::Status, Value::text("Yes")),
        ]);
        assert!(either.matches(&r));
    }

    #[test]
    fn ilike_is_case_insensitive() {
        let mut r = row(42, "Asha Verma", "2025-06-10T09:00");
        r.task_description = Some("Check GENERATOR fuel".into());
        assert!(Filter::ILike(Column::Description, "generator".into()).matches(&r));
        assert!(Filter::ILike(Column::Name, "VERMA".into()).matches(&r));
        assert!(Filter::ILike(Column::TaskId, "4".into()).matches(&r));
        assert!(!Filter::ILike(Column::GivenBy, "x".into()).matches(&r));
    }

    #[test]
    fn ilike_folds_ascii_only() {
        let r = row(7, "ÉMILE Roy", "2025-06-10T09:00");
        assert!(Filter::ILike(Column::Name, "Émile".into()).matches(&r));
        assert!(!Filter::ILike(Column::Name, "émile".into()).matches(&r));
    }

    #[test]
    fn apply_orders_and_windows() {
        let rows = vec![
            row(1, "A", "2025-06-01T09:00"),
            row(2, "A", "2025-06-03T09:00"),
            row(3, "A", "2025-06-02T09:00"),
        ];
        let q = TaskQuery::new(Collection::Checklist)
            .order_by_start(SortOrder::Desc)
            .paginate(1, 2);
        let ids: Vec<i64> = q.apply(&rows).iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![2, 3]);

        let q = q.paginate(2, 2);
        let ids: Vec<i64> = q.apply(&rows).iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn page_range_is_one_based() {
        assert_eq!(PageRange::for_page(1, 50), PageRange { offset: 0, limit: 50 });
        assert_eq!(PageRange::for_page(3, 20), PageRange { offset: 40, limit: 20 });
        assert_eq!(PageRange::for_page(0, 20), PageRange { offset: 0, limit: 20 });
    }
}
