use anyhow::Result;
use rusqlite::Row;

use super::OptionalExt;
use super::novels::touch_novel;
use crate::models::{ChapterListingRow, ChapterRow};
use crate::Database;

const CHAPTER_COLUMNS: &str = "id, novel_id, title, content, chapter_number, status, is_premium,
     coins_cost, word_count, view_count, created_at, updated_at";

#[derive(Debug)]
pub struct NewChapter {
    pub id: String,
    pub novel_id: String,
    pub title: String,
    pub content: String,
    pub chapter_number: i64,
    pub status: String,
    pub is_premium: bool,
    pub coins_cost: i64,
    pub word_count: i64,
}

impl Database {
    /// Every chapter of a novel, drafts included, in reading order.
    pub fn list_chapters(&self, novel_id: &str) -> Result<Vec<ChapterRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE novel_id = ?1 ORDER BY chapter_number ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([novel_id], map_chapter)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Table of contents for readers: published chapters only, no content.
    pub fn list_published_chapters(&self, novel_id: &str) -> Result<Vec<ChapterListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, chapter_number, view_count, is_premium, coins_cost, created_at, updated_at
                 FROM chapters
                 WHERE novel_id = ?1 AND status = 'PUBLISHED'
                 ORDER BY chapter_number ASC",
            )?;
            let rows = stmt
                .query_map([novel_id], |row| {
                    Ok(ChapterListingRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        chapter_number: row.get(2)?,
                        view_count: row.get(3)?,
                        is_premium: row.get(4)?,
                        coins_cost: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_chapter(&self, id: &str) -> Result<Option<ChapterRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_chapter).optional()?;
            Ok(row)
        })
    }

    /// Whether another chapter of the novel already uses `chapter_number`.
    pub fn chapter_number_taken(
        &self,
        novel_id: &str,
        chapter_number: i64,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM chapters
                    WHERE novel_id = ?1 AND chapter_number = ?2 AND (?3 IS NULL OR id != ?3)
                 )",
                rusqlite::params![novel_id, chapter_number, exclude_id],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn create_chapter(&self, chapter: &NewChapter) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO chapters
                    (id, novel_id, title, content, chapter_number, status, is_premium, coins_cost, word_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    chapter.id,
                    chapter.novel_id,
                    chapter.title,
                    chapter.content,
                    chapter.chapter_number,
                    chapter.status,
                    chapter.is_premium,
                    chapter.coins_cost,
                    chapter.word_count,
                ],
            )?;
            touch_novel(&tx, &chapter.novel_id)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Overwrites the editable fields of `chapter.id`. The novel is not moved.
    pub fn update_chapter(&self, chapter: &NewChapter) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE chapters
                 SET title = ?2, content = ?3, chapter_number = ?4, status = ?5,
                     is_premium = ?6, coins_cost = ?7, word_count = ?8, updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![
                    chapter.id,
                    chapter.title,
                    chapter.content,
                    chapter.chapter_number,
                    chapter.status,
                    chapter.is_premium,
                    chapter.coins_cost,
                    chapter.word_count,
                ],
            )?;
            touch_novel(&tx, &chapter.novel_id)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn set_chapter_status(&self, id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE chapters SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, status),
            )?;
            tx.execute(
                "UPDATE novels SET updated_at = datetime('now')
                 WHERE id = (SELECT novel_id FROM chapters WHERE id = ?1)",
                [id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_chapter(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let novel_id: Option<String> = tx
                .query_row("SELECT novel_id FROM chapters WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            let Some(novel_id) = novel_id else {
                return Ok(false);
            };
            tx.execute("DELETE FROM chapters WHERE id = ?1", [id])?;
            touch_novel(&tx, &novel_id)?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Returns false if the chapter does not exist.
    pub fn increment_chapter_views(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chapters SET view_count = view_count + 1 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn map_chapter(row: &Row<'_>) -> rusqlite::Result<ChapterRow> {
    Ok(ChapterRow {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        chapter_number: row.get(4)?,
        status: row.get(5)?,
        is_premium: row.get(6)?,
        coins_cost: row.get(7)?,
        word_count: row.get(8)?,
        view_count: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "author");
        fixtures::novel(&db, "n1", "author", "Dragon Road");
        db
    }

    #[test]
    fn chapters_are_listed_in_reading_order() {
        let db = setup();
        fixtures::chapter(&db, "c3", "n1", 3, None);
        fixtures::chapter(&db, "c1", "n1", 1, None);
        fixtures::chapter(&db, "c2", "n1", 2, Some(10));
        db.set_chapter_status("c3", "DRAFT").unwrap();

        let all: Vec<_> = db.list_chapters("n1").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(all, ["c1", "c2", "c3"]);

        let toc = db.list_published_chapters("n1").unwrap();
        assert_eq!(toc.len(), 2);
        assert!(toc[1].is_premium);
        assert_eq!(toc[1].coins_cost, 10);
    }

    #[test]
    fn chapter_numbers_are_unique_per_novel() {
        let db = setup();
        fixtures::chapter(&db, "c1", "n1", 1, None);

        assert!(db.chapter_number_taken("n1", 1, None).unwrap());
        assert!(!db.chapter_number_taken("n1", 1, Some("c1")).unwrap());
        assert!(!db.chapter_number_taken("n1", 2, None).unwrap());

        let dup = NewChapter {
            id: "c2".into(),
            novel_id: "n1".into(),
            title: "Again".into(),
            content: String::new(),
            chapter_number: 1,
            status: "DRAFT".into(),
            is_premium: false,
            coins_cost: 0,
            word_count: 0,
        };
        assert!(db.create_chapter(&dup).is_err());
    }

    #[test]
    fn update_and_delete() {
        let db = setup();
        fixtures::chapter(&db, "c1", "n1", 1, None);

        db.update_chapter(&NewChapter {
            id: "c1".into(),
            novel_id: "n1".into(),
            title: "Prologue".into(),
            content: "Rewritten".into(),
            chapter_number: 0,
            status: "DRAFT".into(),
            is_premium: true,
            coins_cost: 5,
            word_count: 1,
        })
        .unwrap();

        let chapter = db.get_chapter("c1").unwrap().unwrap();
        assert_eq!(chapter.title, "Prologue");
        assert_eq!(chapter.status, "DRAFT");
        assert!(chapter.is_premium);

        assert!(db.increment_chapter_views("c1").unwrap());
        assert_eq!(db.get_chapter("c1").unwrap().unwrap().view_count, 1);

        assert!(db.delete_chapter("c1").unwrap());
        assert!(!db.delete_chapter("c1").unwrap());
        assert!(!db.increment_chapter_views("c1").unwrap());
    }
}
