use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::UserRow;
use crate::Database;

const USER_COLUMNS: &str =
    "id, email, name, password, role, wallet_coins, premium_until, created_at";

impl Database {
    pub fn create_user(&self, id: &str, email: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Readers become authors once they publish their first novel.
    /// Returns true if the role changed.
    pub fn promote_to_author(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = 'AUTHOR' WHERE id = ?1 AND role = 'READER'",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_user_role(&self, id: &str, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET role = ?2 WHERE id = ?1", (id, role))?;
            Ok(())
        })
    }
}

pub(crate) fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        wallet_coins: row.get(5)?,
        premium_until: row.get(6)?,
        created_at: row.get(7)?,
    })
}
