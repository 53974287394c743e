//! HTTP API tests.
//!
//! Requests go straight through the router with `oneshot`; no socket is bound.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use taskboard::config::DashboardConfig;
use taskboard::dashboard::{ACCESS_HEADER, DashboardServer, ROLE_HEADER, USER_HEADER, build_router};
use taskboard::store::memory::MemoryStore;
use taskboard::types::{Collection, TaskRecord, UserAccount, start_of_day};
use tower::ServiceExt;

/// Rows relative to the real current day, since the server evaluates views as
/// of today.
fn seeded_store() -> Arc<MemoryStore> {
    let today = start_of_day(Utc::now().date_naive());
    let at = |days: i64, hours: i64| today + Duration::days(days) + Duration::hours(hours);

    let store = MemoryStore::new();
    let mut done = TaskRecord::new(1, "Ravi", at(0, 9));
    done.status = Some("Yes".into());
    done.department = Some("Sales".into());
    let mut open = TaskRecord::new(2, "Ravi", at(0, 10));
    open.department = Some("Sales".into());
    let mut late = TaskRecord::new(3, "Asha", at(-3, 9));
    late.department = Some("Accounts".into());
    let mut tomorrow = TaskRecord::new(4, "Asha", at(1, 9));
    tomorrow.department = Some("Accounts".into());
    store.seed(Collection::Checklist, vec![done, open, late, tomorrow]);

    store.seed_users([UserAccount {
        id: 1,
        user_name: Some("Ravi".into()),
        role: Some("user".into()),
        user_access: Some("Sales".into()),
        department: Some("Sales".into()),
        status: Some("active".into()),
    }]);
    Arc::new(store)
}

fn router(store: Arc<MemoryStore>) -> Router {
    build_router(DashboardServer::new(store, DashboardConfig::default()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(ROLE_HEADER, "admin")
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, role: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(ROLE_HEADER, role)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

mod read_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_version() {
        let (status, json) = send(router(seeded_store()), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn summary_uses_camel_case_fields() {
        let (status, json) = send(
            router(seeded_store()),
            get("/api/collections/checklist/summary"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalTasks"], 3);
        assert_eq!(json["completedTasks"], 1);
        assert_eq!(json["pendingTasks"], 1);
        assert_eq!(json["overdueTasks"], 1);
        assert_eq!(json["completionRate"], 33.3);
        assert!(json.get("failed").is_none());
    }

    #[tokio::test]
    async fn task_page_reports_total_and_paging() {
        let (status, json) = send(
            router(seeded_store()),
            get("/api/collections/checklist/tasks?view=all&page=1&page_size=2"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
        // newest start first
        assert_eq!(json["tasks"][0]["task_id"], 2);
    }

    #[tokio::test]
    async fn user_role_is_pinned_to_own_rows() {
        let request = Request::builder()
            .uri("/api/collections/checklist/tasks/count?view=all&staff=Ravi")
            .header(ROLE_HEADER, "user")
            .header(USER_HEADER, "Asha")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(router(seeded_store()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn missing_role_header_means_user() {
        let request = Request::builder()
            .uri("/api/collections/checklist/tasks/count?view=all")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(router(seeded_store()), request).await;
        // no user name, so nothing matches
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn admin_access_header_limits_departments() {
        let request = Request::builder()
            .uri("/api/collections/checklist/tasks/count?view=all")
            .header(ROLE_HEADER, "admin")
            .header(ACCESS_HEADER, "Accounts")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(router(seeded_store()), request).await;
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn staff_page_includes_side_counts() {
        let (status, json) = send(
            router(seeded_store()),
            get("/api/collections/checklist/staff"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalStaff"], 2);
        assert_eq!(json["totalUsers"], 1);
        assert_eq!(json["staff"][0]["name"], "Ravi");
        assert_eq!(json["staff"][0]["progress"], 50);
    }

    #[tokio::test]
    async fn directory_endpoints() {
        let (_, json) = send(router(seeded_store()), get("/api/departments")).await;
        assert_eq!(json, serde_json::json!(["Sales"]));
        let (_, json) = send(
            router(seeded_store()),
            get("/api/staff-names?department=sales"),
        )
        .await;
        assert_eq!(json, serde_json::json!(["Ravi"]));
    }

    #[tokio::test]
    async fn store_failures_degrade_to_empty_results() {
        let store = seeded_store();
        store.fail_when(|_| true);
        let (status, json) = send(
            router(store),
            get("/api/collections/checklist/tasks?view=all"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 0);
        assert!(json["tasks"].as_array().unwrap().is_empty());
        assert!(json["error"].is_string());
    }
}

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_view_is_bad_request() {
        let (status, json) = send(
            router(seeded_store()),
            get("/api/collections/checklist/tasks?view=someday"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn unknown_collection_is_bad_request() {
        let (status, json) = send(
            router(seeded_store()),
            get("/api/collections/inbox/summary"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn unknown_role_is_bad_request() {
        let request = Request::builder()
            .uri("/api/collections/checklist/summary")
            .header(ROLE_HEADER, "superuser")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(router(seeded_store()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn page_zero_is_bad_request() {
        let (status, _) = send(
            router(seeded_store()),
            get("/api/collections/delegation/staff?page=0"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod write_tests {
    use super::*;

    #[tokio::test]
    async fn checklist_submit_updates_rows() {
        let store = seeded_store();
        let body = serde_json::json!([
            {"task_id": 2, "status": "Yes", "remarks": "ok", "image": null}
        ]);
        let (status, json) = send(
            router(store.clone()),
            post("/api/submit/checklist", "user", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0]["status"], "Yes");

        let row = store
            .rows(Collection::Checklist)
            .into_iter()
            .find(|r| r.task_id == 2)
            .unwrap();
        assert!(row.submission_date.is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let body = serde_json::json!([
            {"task_id": 99, "status": "Yes", "remarks": null, "image": null}
        ]);
        let (status, json) = send(
            router(seeded_store()),
            post("/api/submit/checklist", "user", body),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "TASK_NOT_FOUND");
    }

    #[tokio::test]
    async fn mark_done_requires_admin() {
        let store = seeded_store();
        let body = serde_json::json!({"task_ids": [1, 2]});
        let (status, json) = send(
            router(store.clone()),
            post("/api/mark-done", "user", body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_ARGUMENT");

        let (status, json) = send(router(store), post("/api/mark-done", "admin", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], 2);
    }

    #[tokio::test]
    async fn one_time_tasks_become_delegations() {
        let store = seeded_store();
        let due = start_of_day(Utc::now().date_naive()) + Duration::days(2);
        let body = serde_json::json!([{
            "department": "Sales",
            "givenBy": "Boss",
            "doer": "Ravi",
            "description": "Collect payment",
            "dueDate": due,
            "frequency": "one-time"
        }]);
        let (status, json) = send(router(store.clone()), post("/api/assign", "admin", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(store.rows(Collection::Delegation).len(), 1);
        assert_eq!(store.rows(Collection::Checklist).len(), 4);
    }

    #[tokio::test]
    async fn assign_rejects_blank_fields() {
        let body = serde_json::json!([{
            "department": "Sales",
            "givenBy": "Boss",
            "doer": " ",
            "description": "Collect payment",
            "dueDate": "2025-06-12T09:00:00",
            "frequency": "daily"
        }]);
        let (status, json) = send(router(seeded_store()), post("/api/assign", "admin", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_ARGUMENT");
    }
}
