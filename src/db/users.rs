//! User directory queries.

use super::Database;
use crate::types::UserAccount;
use anyhow::Result;
use rusqlite::{Row, params};

fn parse_user_row(row: &Row) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get("id")?,
        user_name: row.get("user_name")?,
        role: row.get("role")?,
        user_access: row.get("user_access")?,
        department: row.get("department")?,
        status: row.get("status")?,
    })
}

impl Database {
    /// Every account, in insertion order.
    pub fn list_users(&self) -> Result<Vec<UserAccount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_name, role, user_access, department, status
                 FROM users ORDER BY id ASC",
            )?;
            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    /// Insert an account and return it with its assigned id.
    pub fn insert_user(
        &self,
        user_name: &str,
        role: &str,
        user_access: Option<&str>,
        department: Option<&str>,
    ) -> Result<UserAccount> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_name, role, user_access, department, status)
                 VALUES (?1, ?2, ?3, ?4, 'active')",
                params![user_name, role, user_access, department],
            )?;
            let id = conn.last_insert_rowid();
            let user = conn.query_row(
                "SELECT id, user_name, role, user_access, department, status
                 FROM users WHERE id = ?1",
                params![id],
                parse_user_row,
            )?;
            Ok(user)
        })
    }
}
