//! Request-scoped caller identity.
//!
//! Every query-building call takes a [`RequestContext`] explicitly; nothing in
//! the crate reads identity from process-wide state.

use crate::types::Role;
use chrono::{Days, NaiveDate, Utc};

/// Identity and clock for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub role: Role,
    /// The caller's own assignee name.
    pub username: String,
    /// Departments an admin may see. Empty means unrestricted.
    pub allowed_departments: Vec<String>,
    /// The calendar day "today"/"tomorrow"/"overdue" are relative to.
    pub today: NaiveDate,
}

impl RequestContext {
    pub fn new(role: Role, username: impl Into<String>) -> Self {
        Self {
            role,
            username: username.into(),
            allowed_departments: Vec::new(),
            today: Utc::now().date_naive(),
        }
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self::new(Role::User, username)
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(Role::Admin, username)
    }

    /// Set the department allow-list from a comma-separated access string.
    pub fn with_access(mut self, user_access: &str) -> Self {
        self.allowed_departments = parse_access(user_access);
        self
    }

    /// Pin "today" (tests, backfills).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn tomorrow(&self) -> NaiveDate {
        self.today
            .checked_add_days(Days::new(1))
            .unwrap_or(self.today)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Split a comma-separated department list, trimming and dropping blanks.
pub fn parse_access(user_access: &str) -> Vec<String> {
    user_access
        .split(',')
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_list_is_trimmed() {
        assert_eq!(
            parse_access(" Sales, Accounts ,,HR"),
            vec!["Sales", "Accounts", "HR"]
        );
        assert!(parse_access("").is_empty());
    }

    #[test]
    fn tomorrow_crosses_month() {
        let ctx = RequestContext::admin("root")
            .with_today(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(ctx.tomorrow(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }
}
