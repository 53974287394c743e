//! Parameterized query construction for dashboard views.
//!
//! One builder serves both collections; the per-collection differences are
//! confined to [`complete_filter`], [`incomplete_filter`] and the overdue
//! status guard in [`view_filters`].

use super::{Column, Filter, TaskQuery, Value};
use crate::context::RequestContext;
use crate::error::{DashboardError, DashboardResult};
use crate::types::{
    CHECKLIST_DONE, Collection, DELEGATION_EXTEND, FILTER_ALL, Role, SortOrder,
    StatusFilter, TaskView, end_of_day, start_of_day,
};
use chrono::NaiveDate;

/// Parameters for a dashboard task-view listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    pub collection: Collection,
    /// Staff name or "all". Ignored for non-admin callers.
    pub staff: Option<String>,
    /// Department name or "all". Applies to checklist only.
    pub department: Option<String>,
    pub view: TaskView,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl ViewParams {
    pub fn new(collection: Collection, view: TaskView) -> Self {
        Self {
            collection,
            staff: None,
            department: None,
            view,
            page: 1,
            page_size: 50,
        }
    }

    pub fn staff(mut self, staff: impl Into<String>) -> Self {
        self.staff = Some(staff.into());
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// Parameters for a checklist date-range listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRangeParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub staff: Option<String>,
    pub department: Option<String>,
    pub status: StatusFilter,
    pub page: u32,
    pub page_size: u32,
}

/// A filter value that actually restricts, i.e. present, non-blank, not "all".
fn restricting(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(FILTER_ALL))
}

/// Reject page 0 and empty pages.
pub fn validate_page(page: u32, page_size: u32) -> DashboardResult<()> {
    if page < 1 {
        return Err(DashboardError::invalid_value("page", "page must be >= 1"));
    }
    if page_size == 0 {
        return Err(DashboardError::invalid_value(
            "page_size",
            "page size must be > 0",
        ));
    }
    Ok(())
}

/// Caller-identity restrictions.
///
/// A `user` is always pinned to their own rows regardless of `staff`. An
/// `admin` gets the staff filter and, when they carry one, the department
/// allow-list.
pub fn identity_filters(ctx: &RequestContext, staff: Option<&str>) -> Vec<Filter> {
    let mut filters = Vec::new();
    match ctx.role {
        Role::User => {
            filters.push(Filter::Eq(Column::Name, Value::text(&ctx.username)));
        }
        Role::Admin => {
            if let Some(staff) = restricting(staff) {
                filters.push(Filter::Eq(Column::Name, Value::text(staff)));
            }
            if !ctx.allowed_departments.is_empty() {
                filters.push(Filter::In(
                    Column::Department,
                    ctx.allowed_departments.clone(),
                ));
            }
        }
    }
    filters
}

/// Identity restrictions plus the dashboard department filter.
///
/// The department filter only narrows checklist dashboards.
pub fn scope_filters(
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
) -> Vec<Filter> {
    let mut filters = identity_filters(ctx, staff);
    if collection == Collection::Checklist {
        if let Some(department) = restricting(department) {
            filters.push(Filter::Eq(Column::Department, Value::text(department)));
        }
    }
    filters
}

/// Checklist: status is null or not "Yes". Delegation: not yet submitted.
pub fn incomplete_filter(collection: Collection) -> Filter {
    match collection {
        Collection::Checklist => not_status(CHECKLIST_DONE),
        Collection::Delegation => Filter::IsNull(Column::SubmissionDate),
    }
}

/// Checklist: status is "Yes". Delegation: a submission timestamp exists.
pub fn complete_filter(collection: Collection) -> Filter {
    match collection {
        Collection::Checklist => Filter::Eq(Column::Status, Value::text(CHECKLIST_DONE)),
        Collection::Delegation => Filter::NotNull(Column::SubmissionDate),
    }
}

fn not_status(status: &str) -> Filter {
    Filter::Or(vec![
        Filter::IsNull(Column::Status),
        Filter::Neq(Column::Status, Value::text(status)),
    ])
}

fn start_between(from: NaiveDate, to: NaiveDate) -> [Filter; 2] {
    [
        Filter::Gte(Column::TaskStartDate, Value::Time(start_of_day(from))),
        Filter::Lte(Column::TaskStartDate, Value::Time(end_of_day(to))),
    ]
}

/// Scheduled start no later than the end of today.
pub fn up_to_today(ctx: &RequestContext) -> Filter {
    Filter::Lte(Column::TaskStartDate, Value::Time(end_of_day(ctx.today)))
}

/// Date/status window for a task view.
pub fn view_filters(ctx: &RequestContext, collection: Collection, view: TaskView) -> Vec<Filter> {
    let mut filters = Vec::new();
    match view {
        TaskView::Recent => {
            filters.extend(start_between(ctx.today, ctx.today));
            if collection == Collection::Checklist {
                filters.push(not_status(CHECKLIST_DONE));
            }
        }
        TaskView::Upcoming => {
            let tomorrow = ctx.tomorrow();
            filters.extend(start_between(tomorrow, tomorrow));
        }
        TaskView::Overdue => {
            filters.push(Filter::Lt(
                Column::TaskStartDate,
                Value::Time(start_of_day(ctx.today)),
            ));
            filters.push(Filter::IsNull(Column::SubmissionDate));
            filters.push(not_status(collection.done_status()));
        }
        TaskView::All => filters.push(up_to_today(ctx)),
    }
    filters
}

/// Paginated listing for a task view, newest scheduled start first.
pub fn build_view_query(ctx: &RequestContext, params: &ViewParams) -> DashboardResult<TaskQuery> {
    validate_page(params.page, params.page_size)?;
    Ok(build_view_count_query(ctx, params)
        .order_by_start(SortOrder::Desc)
        .paginate(params.page, params.page_size))
}

/// The unpaginated form of [`build_view_query`], for exact counts.
pub fn build_view_count_query(ctx: &RequestContext, params: &ViewParams) -> TaskQuery {
    TaskQuery::new(params.collection)
        .filters(scope_filters(
            ctx,
            params.collection,
            params.staff.as_deref(),
            params.department.as_deref(),
        ))
        .filters(view_filters(ctx, params.collection, params.view))
}

/// Free-text search across id, assignee, giver, department and description.
pub fn search_filter(term: Option<&str>) -> Option<Filter> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    Some(Filter::Or(
        [
            Column::TaskId,
            Column::Name,
            Column::GivenBy,
            Column::Department,
            Column::Description,
        ]
        .into_iter()
        .map(|c| Filter::ILike(c, term.to_string()))
        .collect(),
    ))
}

/// Checklist rows still awaiting submission, oldest first.
pub fn build_checklist_pending_query(
    ctx: &RequestContext,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> DashboardResult<TaskQuery> {
    validate_page(page, page_size)?;
    let mut query = TaskQuery::new(Collection::Checklist)
        .filter(up_to_today(ctx))
        .filter(Filter::IsNull(Column::SubmissionDate))
        .filter(Filter::IsNull(Column::Status))
        .filters(identity_filters(ctx, None));
    if let Some(search) = search_filter(search) {
        query = query.filter(search);
    }
    Ok(query
        .order_by_start(SortOrder::Asc)
        .paginate(page, page_size))
}

/// Submitted checklist rows, newest first.
pub fn build_checklist_history_query(
    ctx: &RequestContext,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> DashboardResult<TaskQuery> {
    validate_page(page, page_size)?;
    let mut query = TaskQuery::new(Collection::Checklist)
        .filter(Filter::NotNull(Column::SubmissionDate))
        .filter(Filter::NotNull(Column::Status))
        .filters(identity_filters(ctx, None));
    if let Some(search) = search_filter(search) {
        query = query.filter(search);
    }
    Ok(query
        .order_by_start(SortOrder::Desc)
        .paginate(page, page_size))
}

/// Open or extended delegation rows, oldest first.
pub fn build_delegation_pending_query(ctx: &RequestContext) -> TaskQuery {
    TaskQuery::new(Collection::Delegation)
        .filter(Filter::Or(vec![
            Filter::IsNull(Column::Status),
            Filter::Eq(Column::Status, Value::text(DELEGATION_EXTEND)),
        ]))
        .filters(identity_filters(ctx, None))
        .order_by_start(SortOrder::Asc)
}

/// Checklist rows in a date range with a status filter (unpaginated).
pub fn build_date_range_count_query(ctx: &RequestContext, params: &DateRangeParams) -> TaskQuery {
    let mut query = TaskQuery::new(Collection::Checklist);
    if let Some(start) = params.start {
        query = query.filter(Filter::Gte(
            Column::TaskStartDate,
            Value::Time(start_of_day(start)),
        ));
    }
    if let Some(end) = params.end {
        query = query.filter(Filter::Lte(Column::TaskStartDate, Value::Time(end_of_day(end))));
    }
    query = query.filters(identity_filters(ctx, params.staff.as_deref()));
    if let Some(department) = restricting(params.department.as_deref()) {
        query = query.filter(Filter::Eq(Column::Department, Value::text(department)));
    }

    let today_start = Value::Time(start_of_day(ctx.today));
    match params.status {
        StatusFilter::All => query,
        StatusFilter::Completed => {
            query.filter(Filter::Eq(Column::Status, Value::text(CHECKLIST_DONE)))
        }
        StatusFilter::Pending => query
            .filter(not_status(CHECKLIST_DONE))
            .filter(Filter::Gte(Column::TaskStartDate, today_start)),
        StatusFilter::Overdue => query
            .filter(not_status(CHECKLIST_DONE))
            .filter(Filter::IsNull(Column::SubmissionDate))
            .filter(Filter::Lt(Column::TaskStartDate, today_start)),
    }
}

/// Paginated form of [`build_date_range_count_query`], newest first.
pub fn build_date_range_query(
    ctx: &RequestContext,
    params: &DateRangeParams,
) -> DashboardResult<TaskQuery> {
    validate_page(params.page, params.page_size)?;
    Ok(build_date_range_count_query(ctx, params)
        .order_by_start(SortOrder::Desc)
        .paginate(params.page, params.page_size))
}

/// Rows whose assignee names make up the staff roster.
pub fn build_staff_names_query(
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
) -> TaskQuery {
    TaskQuery::new(collection)
        .filter(Filter::NotNull(Column::Name))
        .filter(up_to_today(ctx))
        .filters(scope_filters(ctx, collection, staff, department))
}

/// One staff member's tasks up to today.
///
/// Admin allow-lists still apply so a rollup never counts rows the caller
/// could not list.
pub fn build_staff_tasks_query(
    ctx: &RequestContext,
    collection: Collection,
    staff_name: &str,
) -> TaskQuery {
    let mut query = TaskQuery::new(collection)
        .filter(Filter::Eq(Column::Name, Value::text(staff_name)))
        .filter(up_to_today(ctx));
    if ctx.role == Role::Admin && !ctx.allowed_departments.is_empty() {
        query = query.filter(Filter::In(
            Column::Department,
            ctx.allowed_departments.clone(),
        ));
    }
    query
}

/// Grouped form of [`build_staff_tasks_query`] covering several staff at once.
pub fn build_staff_group_query(
    ctx: &RequestContext,
    collection: Collection,
    staff_names: &[String],
) -> TaskQuery {
    let mut query = TaskQuery::new(collection)
        .filter(Filter::In(Column::Name, staff_names.to_vec()))
        .filter(up_to_today(ctx));
    if ctx.role == Role::Admin && !ctx.allowed_departments.is_empty() {
        query = query.filter(Filter::In(
            Column::Department,
            ctx.allowed_departments.clone(),
        ));
    }
    query
}

/// The four aggregator counts for one scope, in order total, completed,
/// pending, overdue.
pub fn build_summary_queries(
    ctx: &RequestContext,
    collection: Collection,
    staff: Option<&str>,
    department: Option<&str>,
) -> [TaskQuery; 4] {
    let scoped = || {
        TaskQuery::new(collection).filters(scope_filters(ctx, collection, staff, department))
    };
    [
        scoped().filters(view_filters(ctx, collection, TaskView::All)),
        scoped()
            .filters(view_filters(ctx, collection, TaskView::All))
            .filter(complete_filter(collection)),
        scoped()
            .filters(view_filters(ctx, collection, TaskView::Recent))
            .filter(incomplete_filter(collection)),
        scoped().filters(view_filters(ctx, collection, TaskView::Overdue)),
    ]
}
