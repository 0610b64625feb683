use anyhow::Result;

use super::novels::{NOVEL_SELECT, map_novel};
use crate::models::NovelRow;
use crate::Database;

impl Database {
    /// Returns true if the bookmark is new.
    pub fn add_bookmark(&self, user_id: &str, novel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO bookmarks (user_id, novel_id) VALUES (?1, ?2)",
                (user_id, novel_id),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Returns true if a bookmark was removed.
    pub fn remove_bookmark(&self, user_id: &str, novel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM bookmarks WHERE user_id = ?1 AND novel_id = ?2",
                (user_id, novel_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_bookmarked(&self, user_id: &str, novel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM bookmarks WHERE user_id = ?1 AND novel_id = ?2)",
                (user_id, novel_id),
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    /// The reader's bookshelf, most recently bookmarked first.
    pub fn list_bookmarked_novels(&self, user_id: &str) -> Result<Vec<NovelRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{NOVEL_SELECT}
                 JOIN bookmarks bm ON bm.novel_id = n.id
                 WHERE bm.user_id = ?1
                 ORDER BY bm.created_at DESC, bm.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_novel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;
    use crate::Database;

    #[test]
    fn bookmarks_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "author");
        fixtures::user(&db, "reader");
        fixtures::novel(&db, "n1", "author", "Dragon Road");

        assert!(db.add_bookmark("reader", "n1").unwrap());
        assert!(!db.add_bookmark("reader", "n1").unwrap());
        assert!(db.is_bookmarked("reader", "n1").unwrap());

        let shelf = db.list_bookmarked_novels("reader").unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].bookmarks_count, 1);

        assert!(db.remove_bookmark("reader", "n1").unwrap());
        assert!(!db.remove_bookmark("reader", "n1").unwrap());
        assert!(!db.is_bookmarked("reader", "n1").unwrap());
    }

    #[test]
    fn bookmarking_unknown_novel_fails() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "reader");
        assert!(db.add_bookmark("reader", "missing").is_err());
    }
}
