use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, placeholders};
use crate::models::CommentRow;
use crate::Database;

const COMMENT_SELECT: &str = "
    SELECT c.id, c.chapter_id, c.parent_id, c.user_id, u.name, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.user_id = u.id";

impl Database {
    /// One page of top-level comments, newest first.
    pub fn list_root_comments(&self, chapter_id: &str, limit: u32, offset: u32) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.chapter_id = ?1 AND c.parent_id IS NULL
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![chapter_id, limit, offset], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_root_comments(&self, chapter_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE chapter_id = ?1 AND parent_id IS NULL",
                [chapter_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Batch-fetch replies to a set of comments, oldest first.
    pub fn get_replies(&self, parent_ids: &[String]) -> Result<Vec<CommentRow>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.parent_id IN ({})
                 ORDER BY c.created_at ASC, c.rowid ASC",
                placeholders(parent_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(parent_ids.iter()), map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn create_comment(
        &self,
        id: &str,
        chapter_id: &str,
        user_id: &str,
        parent_id: Option<&str>,
        content: &str,
    ) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, chapter_id, user_id, parent_id, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, chapter_id, user_id, parent_id, content],
            )?;
            query_comment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Comment vanished after insert: {}", id))
        })
    }

    /// Deletes a comment together with its direct replies.
    /// Returns the number of comments removed.
    pub fn delete_comment_thread(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let replies = tx.execute("DELETE FROM comments WHERE parent_id = ?1", [id])?;
            let own = tx.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(replies + own)
        })
    }
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_comment).optional()?;
    Ok(row)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        chapter_id: row.get(1)?,
        parent_id: row.get(2)?,
        user_id: row.get(3)?,
        user_name: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "unknown".to_string()),
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}
