//! HTTP server implementation for the dashboard API.
//!
//! Read endpoints never fail on store errors: they log and answer with empty
//! pages or zero counts. Malformed parameters and failed writes answer with
//! `{success: false, code, message}`.

use axum::{
    Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::aggregate::{DashboardSummary, DateRangeStats, date_range_stats, summarize};
use crate::config::DashboardConfig;
use crate::context::RequestContext;
use crate::directory::{fetch_departments, fetch_staff_names, total_users_count};
use crate::error::{DashboardError, ErrorCode};
use crate::lifecycle::{assign_tasks, mark_done, submit_checklist, submit_delegation};
use crate::query::{DateRangeParams, ViewParams};
use crate::rollup::{StaffPage, fetch_staff_page};
use crate::store::TaskStore;
use crate::types::{
    ChecklistSubmission, Collection, DelegationSubmission, NewTask, Role, StatusFilter,
    TaskRecord, TaskView,
};
use crate::views::{
    TaskPage, count_date_range, count_view, fetch_checklist_history, fetch_checklist_pending,
    fetch_date_range, fetch_delegation_pending, fetch_view,
};

/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-role";
/// Header carrying the caller's own assignee name.
pub const USER_HEADER: &str = "x-user-name";
/// Header carrying the caller's comma-separated department allow-list.
pub const ACCESS_HEADER: &str = "x-user-access";

/// Shared handler state.
#[derive(Clone)]
pub struct DashboardServer {
    store: Arc<dyn TaskStore>,
    defaults: DashboardConfig,
}

impl DashboardServer {
    pub fn new(store: Arc<dyn TaskStore>, defaults: DashboardConfig) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &dyn TaskStore {
        self.store.as_ref()
    }
}

/// Error response wrapper.
pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::QueryFailed | ErrorCode::WriteFailed | ErrorCode::ConfigMissing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(self.0.to_body())).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Caller identity built from request headers.
///
/// A missing role header means `user`.
pub struct Caller(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role: Role = header(&parts.headers, ROLE_HEADER)
            .unwrap_or("user")
            .parse()?;
        let username = header(&parts.headers, USER_HEADER).unwrap_or_default();
        let mut ctx = RequestContext::new(role, username);
        if let Some(access) = header(&parts.headers, ACCESS_HEADER) {
            ctx = ctx.with_access(access);
        }
        Ok(Caller(ctx))
    }
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>, DashboardError>
where
    T: std::str::FromStr<Err = DashboardError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, DashboardError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|e| DashboardError::invalid_value(field, e.to_string()))
        })
        .transpose()
}

/// Query string shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    view: Option<String>,
    staff: Option<String>,
    department: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
    search: Option<String>,
    start: Option<String>,
    end: Option<String>,
    status: Option<String>,
}

impl ListQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    fn page_size_or(&self, default: u32) -> u32 {
        self.page_size.unwrap_or(default)
    }

    fn view_params(&self, collection: Collection, defaults: &DashboardConfig) -> Result<ViewParams, DashboardError> {
        let view: TaskView = parse_opt(self.view.as_deref())?.unwrap_or_default();
        Ok(ViewParams {
            collection,
            staff: self.staff.clone(),
            department: self.department.clone(),
            view,
            page: self.page(),
            page_size: self.page_size_or(defaults.page_size),
        })
    }

    fn date_range(&self, defaults: &DashboardConfig) -> Result<DateRangeParams, DashboardError> {
        Ok(DateRangeParams {
            start: parse_date("start", self.start.as_deref())?,
            end: parse_date("end", self.end.as_deref())?,
            staff: self.staff.clone(),
            department: self.department.clone(),
            status: parse_opt::<StatusFilter>(self.status.as_deref())?.unwrap_or_default(),
            page: self.page(),
            page_size: self.page_size_or(defaults.page_size),
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkDoneRequest {
    pub task_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse<T> {
    pub success: bool,
    pub data: T,
}

fn written<T>(data: T) -> ApiResult<WriteResponse<T>> {
    Ok(Json(WriteResponse {
        success: true,
        data,
    }))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API root - returns available endpoints.
async fn api_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "tasks": "/api/collections/{collection}/tasks",
            "summary": "/api/collections/{collection}/summary",
            "staff": "/api/collections/{collection}/staff",
            "range": "/api/range",
            "departments": "/api/departments",
        }
    }))
}

async fn api_tasks(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Path(collection): Path<String>,
    Query(q): Query<ListQuery>,
) -> ApiResult<TaskPage> {
    let collection: Collection = collection.parse()?;
    let params = q.view_params(collection, &state.defaults)?;
    Ok(Json(fetch_view(state.store(), &ctx, &params).await?))
}

async fn api_tasks_count(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Path(collection): Path<String>,
    Query(q): Query<ListQuery>,
) -> ApiResult<CountResponse> {
    let collection: Collection = collection.parse()?;
    let params = q.view_params(collection, &state.defaults)?;
    let count = count_view(state.store(), &ctx, &params).await;
    Ok(Json(CountResponse { count }))
}

async fn api_summary(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Path(collection): Path<String>,
    Query(q): Query<ListQuery>,
) -> ApiResult<DashboardSummary> {
    let collection: Collection = collection.parse()?;
    let summary = summarize(
        state.store(),
        &ctx,
        collection,
        q.staff.as_deref(),
        q.department.as_deref(),
    )
    .await;
    Ok(Json(summary))
}

async fn api_staff(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Path(collection): Path<String>,
    Query(q): Query<ListQuery>,
) -> ApiResult<StaffPage> {
    let collection: Collection = collection.parse()?;
    let page = fetch_staff_page(
        state.store(),
        &ctx,
        collection,
        q.staff.as_deref(),
        q.department.as_deref(),
        q.page(),
        q.page_size_or(state.defaults.staff_page_size),
    )
    .await?;
    Ok(Json(page))
}

async fn api_range(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Query(q): Query<ListQuery>,
) -> ApiResult<TaskPage> {
    let params = q.date_range(&state.defaults)?;
    Ok(Json(fetch_date_range(state.store(), &ctx, &params).await?))
}

async fn api_range_count(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Query(q): Query<ListQuery>,
) -> ApiResult<CountResponse> {
    let params = q.date_range(&state.defaults)?;
    let count = count_date_range(state.store(), &ctx, &params).await;
    Ok(Json(CountResponse { count }))
}

async fn api_range_stats(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Query(q): Query<ListQuery>,
) -> ApiResult<DateRangeStats> {
    let params = q.date_range(&state.defaults)?;
    let stats = match date_range_stats(state.store(), &ctx, &params).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, "date range stats failed");
            DateRangeStats::from_rows(&[], ctx.today, params.start, params.end)
        }
    };
    Ok(Json(stats))
}

async fn api_checklist_pending(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Query(q): Query<ListQuery>,
) -> ApiResult<TaskPage> {
    let page = fetch_checklist_pending(
        state.store(),
        &ctx,
        q.search.as_deref(),
        q.page(),
        q.page_size_or(state.defaults.page_size),
    )
    .await?;
    Ok(Json(page))
}

async fn api_checklist_history(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Query(q): Query<ListQuery>,
) -> ApiResult<TaskPage> {
    let page = fetch_checklist_history(
        state.store(),
        &ctx,
        q.search.as_deref(),
        q.page(),
        q.page_size_or(state.defaults.page_size),
    )
    .await?;
    Ok(Json(page))
}

async fn api_delegation_pending(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
) -> Json<Vec<TaskRecord>> {
    Json(fetch_delegation_pending(state.store(), &ctx).await)
}

async fn api_departments(State(state): State<DashboardServer>) -> Json<Vec<String>> {
    Json(fetch_departments(state.store()).await.unwrap_or_else(|e| {
        warn!(error = %e, "department fetch failed");
        Vec::new()
    }))
}

async fn api_staff_names(
    State(state): State<DashboardServer>,
    Query(q): Query<ListQuery>,
) -> Json<Vec<String>> {
    Json(
        fetch_staff_names(state.store(), q.department.as_deref())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "staff name fetch failed");
                Vec::new()
            }),
    )
}

async fn api_users_count(State(state): State<DashboardServer>) -> Json<CountResponse> {
    let count = match state.store().list_users().await {
        Ok(users) => total_users_count(&users),
        Err(e) => {
            warn!(error = %e, "user count failed");
            0
        }
    };
    Json(CountResponse { count })
}

async fn api_assign(
    State(state): State<DashboardServer>,
    Json(tasks): Json<Vec<NewTask>>,
) -> ApiResult<WriteResponse<Vec<TaskRecord>>> {
    written(assign_tasks(state.store(), &tasks).await?)
}

async fn api_checklist_submit(
    State(state): State<DashboardServer>,
    Json(items): Json<Vec<ChecklistSubmission>>,
) -> ApiResult<WriteResponse<Vec<TaskRecord>>> {
    written(submit_checklist(state.store(), &items).await?)
}

async fn api_delegation_submit(
    State(state): State<DashboardServer>,
    Json(item): Json<DelegationSubmission>,
) -> ApiResult<WriteResponse<TaskRecord>> {
    written(submit_delegation(state.store(), &item).await?)
}

async fn api_mark_done(
    State(state): State<DashboardServer>,
    Caller(ctx): Caller,
    Json(req): Json<MarkDoneRequest>,
) -> ApiResult<WriteResponse<u64>> {
    written(mark_done(state.store(), &ctx, &req.task_ids).await?)
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api", get(api_root))
        .route("/api/health", get(health))
        // Directory
        .route("/api/departments", get(api_departments))
        .route("/api/staff-names", get(api_staff_names))
        .route("/api/users/count", get(api_users_count))
        // Checklist date ranges and work lists
        .route("/api/range", get(api_range))
        .route("/api/range/count", get(api_range_count))
        .route("/api/range/stats", get(api_range_stats))
        .route("/api/pending/checklist", get(api_checklist_pending))
        .route("/api/history/checklist", get(api_checklist_history))
        .route("/api/pending/delegation", get(api_delegation_pending))
        // Per-collection dashboard reads
        .route("/api/collections/{collection}/tasks", get(api_tasks))
        .route("/api/collections/{collection}/tasks/count", get(api_tasks_count))
        .route("/api/collections/{collection}/summary", get(api_summary))
        .route("/api/collections/{collection}/staff", get(api_staff))
        // Writes
        .route("/api/assign", post(api_assign))
        .route("/api/submit/checklist", post(api_checklist_submit))
        .route("/api/submit/delegation", post(api_delegation_submit))
        .route("/api/mark-done", post(api_mark_done))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: DashboardServer,
    addr: SocketAddr,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Dashboard API shutting down");
            })
            .await
        {
            tracing::error!("Dashboard API error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
