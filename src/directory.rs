//! User directory lookups backing the department and staff filters.

use crate::context::parse_access;
use crate::error::DashboardResult;
use crate::store::TaskStore;
use crate::types::UserAccount;
use std::collections::HashSet;

fn named(user: &UserAccount) -> Option<&str> {
    user.user_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

fn is_admin_account(user: &UserAccount) -> bool {
    let admin = |v: &Option<String>| {
        v.as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("admin"))
    };
    admin(&user.role) || admin(&user.user_access)
}

/// Distinct non-blank departments, trimmed, sorted case-insensitively.
pub fn unique_departments(users: &[UserAccount]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut departments: Vec<String> = users
        .iter()
        .filter_map(|u| u.department.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(d.to_string()))
        .map(str::to_string)
        .collect();
    departments.sort_by_key(|d| d.to_lowercase());
    departments
}

/// Non-admin staff names, optionally limited to those whose access list
/// contains `department` (case-insensitive). Duplicates removed.
pub fn staff_names_by_department(users: &[UserAccount], department: Option<&str>) -> Vec<String> {
    let department = department
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case(crate::types::FILTER_ALL))
        .map(str::to_lowercase);

    let mut seen = HashSet::new();
    users
        .iter()
        .filter(|u| !is_admin_account(u))
        .filter(|u| match &department {
            None => true,
            Some(wanted) => u
                .user_access
                .as_deref()
                .map(parse_access)
                .unwrap_or_default()
                .iter()
                .any(|d| d.to_lowercase() == *wanted),
        })
        .filter_map(named)
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

/// Accounts with a non-blank user name.
pub fn total_users_count(users: &[UserAccount]) -> u64 {
    users.iter().filter(|u| named(u).is_some()).count() as u64
}

/// Store-backed form of [`unique_departments`].
pub async fn fetch_departments(store: &dyn TaskStore) -> DashboardResult<Vec<String>> {
    Ok(unique_departments(&store.list_users().await?))
}

/// Store-backed form of [`staff_names_by_department`].
pub async fn fetch_staff_names(
    store: &dyn TaskStore,
    department: Option<&str>,
) -> DashboardResult<Vec<String>> {
    Ok(staff_names_by_department(
        &store.list_users().await?,
        department,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, name: &str, role: &str, access: &str, department: &str) -> UserAccount {
        UserAccount {
            id,
            user_name: Some(name.to_string()),
            role: Some(role.to_string()),
            user_access: Some(access.to_string()),
            department: Some(department.to_string()),
            status: Some("active".to_string()),
        }
    }

    fn users() -> Vec<UserAccount> {
        vec![
            account(1, "Ravi", "user", "Sales, Stores", " sales "),
            account(2, "Asha", "user", "accounts", "Accounts"),
            account(3, "Boss", "admin", "Sales", "Admin"),
            account(4, "", "user", "Sales", ""),
            account(5, "Ravi", "user", "sales", "sales"),
        ]
    }

    #[test]
    fn departments_are_trimmed_deduped_and_sorted() {
        assert_eq!(unique_departments(&users()), vec!["Accounts", "Admin", "sales"]);
    }

    #[test]
    fn staff_filter_matches_access_case_insensitively() {
        assert_eq!(staff_names_by_department(&users(), Some("SALES")), vec!["Ravi"]);
        assert_eq!(
            staff_names_by_department(&users(), Some("all")),
            vec!["Ravi", "Asha"]
        );
        assert!(staff_names_by_department(&users(), Some("HR")).is_empty());
    }

    #[test]
    fn blank_names_are_not_counted() {
        assert_eq!(total_users_count(&users()), 4);
    }
}
