//! Staff rollup tests.

use chrono::NaiveDate;
use taskboard::context::RequestContext;
use taskboard::error::ErrorCode;
use taskboard::query::{Column, Filter, Value};
use taskboard::rollup::{StaffRoster, fetch_staff_page};
use taskboard::store::TaskStore;
use taskboard::store::memory::MemoryStore;
use taskboard::types::{Collection, TaskRecord, UserAccount, parse_timestamp};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn admin() -> RequestContext {
    RequestContext::admin("root").with_today(today())
}

fn task(id: i64, name: &str, start: &str, status: Option<&str>, department: &str) -> TaskRecord {
    let mut r = TaskRecord::new(id, name, parse_timestamp(start).unwrap());
    r.status = status.map(String::from);
    r.department = Some(department.to_string());
    r
}

fn user(id: i64, name: &str) -> UserAccount {
    UserAccount {
        id,
        user_name: Some(name.to_string()),
        role: Some("user".into()),
        user_access: None,
        department: None,
        status: Some("active".into()),
    }
}

/// Three staff with a mix of done, open and future checklist rows.
fn seeded(store: MemoryStore) -> MemoryStore {
    store.seed(
        Collection::Checklist,
        vec![
            task(1, "Ravi", "2025-06-09T09:00", Some("Yes"), "Sales"),
            task(2, "Asha", "2025-06-09T09:00", None, "Accounts"),
            task(3, "Ravi", "2025-06-10T09:00", None, "Sales"),
            task(4, "Meena", "2025-06-08T09:00", Some("Yes"), "Stores"),
            task(5, "Ravi", "2025-06-05T09:00", Some("No"), "Accounts"),
            task(6, "Asha", "2025-06-12T09:00", None, "Accounts"),
            task(7, "Meena", "2025-06-10T10:00", Some("Yes"), "Stores"),
        ],
    );
    store.seed_users([user(1, "Ravi"), user(2, "Asha"), user(3, " ")]);
    store
}

mod page_tests {
    use super::*;

    #[tokio::test]
    async fn grouped_and_per_staff_counts_agree() {
        let plain = seeded(MemoryStore::new());
        let grouped = seeded(MemoryStore::new().with_grouping());

        let a = fetch_staff_page(&plain, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        let b = fetch_staff_page(&grouped, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        assert_eq!(a, b);

        let names: Vec<&str> = a.staff.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ravi", "Asha", "Meena"]);

        let ravi = &a.staff[0];
        assert_eq!((ravi.total_tasks, ravi.completed_tasks), (3, 1));
        assert_eq!(ravi.progress, 33);
        assert_eq!(ravi.id, "ravi");
        assert_eq!(ravi.email, "ravi@example.com");

        // the future row is not counted
        let asha = &a.staff[1];
        assert_eq!((asha.total_tasks, asha.completed_tasks), (1, 0));

        for s in &a.staff {
            assert_eq!(s.completed_tasks + s.pending_tasks, s.total_tasks);
        }
    }

    #[tokio::test]
    async fn grouping_uses_a_single_request() {
        let grouped = seeded(MemoryStore::new().with_grouping());
        fetch_staff_page(&grouped, &admin(), Collection::Checklist, None, None, 2, 1)
            .await
            .unwrap();
        // roster names plus one grouped count
        assert_eq!(grouped.read_count(), 2);

        let plain = seeded(MemoryStore::new());
        fetch_staff_page(&plain, &admin(), Collection::Checklist, None, None, 1, 3)
            .await
            .unwrap();
        // roster, one select per staff, distinct count
        assert_eq!(plain.read_count(), 5);
    }

    #[tokio::test]
    async fn side_counts_only_on_first_page() {
        let store = seeded(MemoryStore::new());
        let first = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 1, 2)
            .await
            .unwrap();
        assert_eq!(first.staff.len(), 2);
        assert_eq!(first.total_staff, Some(3));
        assert_eq!(first.total_users, Some(2));

        let second = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 2, 2)
            .await
            .unwrap();
        assert_eq!(second.staff.len(), 1);
        assert_eq!(second.total_staff, None);
        assert_eq!(second.total_users, None);
    }

    #[tokio::test]
    async fn department_filter_narrows_the_roster_only() {
        let store = seeded(MemoryStore::new());
        let page = fetch_staff_page(
            &store,
            &admin(),
            Collection::Checklist,
            None,
            Some("Sales"),
            1,
            10,
        )
        .await
        .unwrap();
        assert_eq!(page.staff.len(), 1);
        // Ravi's Accounts row still counts
        assert_eq!(page.staff[0].total_tasks, 3);
        assert_eq!(page.total_staff, Some(1));
    }

    #[tokio::test]
    async fn user_sees_only_themselves() {
        let store = seeded(MemoryStore::new());
        let ctx = RequestContext::user("Asha").with_today(today());
        let page = fetch_staff_page(&store, &ctx, Collection::Checklist, Some("Ravi"), None, 1, 10)
            .await
            .unwrap();
        let names: Vec<&str> = page.staff.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Asha"]);
    }

    #[tokio::test]
    async fn invalid_page_is_rejected() {
        let store = MemoryStore::new();
        let err = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 0, 10)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn failed_staff_fetch_drops_only_that_entry() {
        let store = seeded(MemoryStore::new());
        let asha = Filter::Eq(Column::Name, Value::text("Asha"));
        store.fail_when(move |q| q.filters.contains(&asha));

        let page = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        let names: Vec<&str> = page.staff.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ravi", "Meena"]);
        assert_eq!(page.total_staff, Some(3));
    }

    #[tokio::test]
    async fn failed_grouping_falls_back_per_staff() {
        let store = seeded(MemoryStore::new().with_grouping());
        store.fail_when(|q| {
            q.filters
                .iter()
                .any(|f| matches!(f, Filter::In(Column::Name, _)))
        });
        let page = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        assert_eq!(page.staff.len(), 3);
        assert_eq!(page.staff[2].completed_tasks, 2);
    }

    #[tokio::test]
    async fn failed_directory_leaves_users_unknown() {
        let store = seeded(MemoryStore::new());
        store.fail_users();
        let page = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        assert_eq!(page.staff.len(), 3);
        assert_eq!(page.total_staff, Some(3));
        assert_eq!(page.total_users, None);
    }

    #[tokio::test]
    async fn failed_roster_gives_empty_page() {
        let store = seeded(MemoryStore::new());
        store.fail_when(|q| {
            q.filters
                .iter()
                .any(|f| matches!(f, Filter::NotNull(Column::Name)))
        });
        let page = fetch_staff_page(&store, &admin(), Collection::Checklist, None, None, 1, 10)
            .await
            .unwrap();
        assert!(page.staff.is_empty());
        assert_eq!(page.total_staff, None);
        assert_eq!(page.total_users, Some(2));
    }
}

mod roster_tests {
    use super::*;

    #[tokio::test]
    async fn roster_collects_every_page() {
        let store = seeded(MemoryStore::new());
        let mut roster = StaffRoster::new();
        let mut fetches = 0;
        while let Some(page_no) = roster.begin_next() {
            let page = fetch_staff_page(
                &store as &dyn TaskStore,
                &admin(),
                Collection::Checklist,
                None,
                None,
                page_no,
                2,
            )
            .await
            .unwrap();
            roster.finish(page);
            fetches += 1;
        }
        assert_eq!(fetches, 2);
        assert_eq!(roster.staff.len(), 3);
        assert!(!roster.has_more());
        assert!(!roster.is_loading());
    }
}
