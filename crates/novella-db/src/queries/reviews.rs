use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::{RatingStats, ReviewRow};
use crate::Database;

const REVIEW_SELECT: &str = "
    SELECT r.id, r.novel_id, r.user_id, u.name, r.rating, r.content, r.created_at, r.updated_at
    FROM reviews r
    LEFT JOIN users u ON r.user_id = u.id";

impl Database {
    pub fn list_reviews(&self, novel_id: &str, limit: u32, offset: u32) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{REVIEW_SELECT}
                 WHERE r.novel_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![novel_id, limit, offset], map_review)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Average and count computed from the reviews table itself.
    pub fn rating_stats(&self, novel_id: &str) -> Result<RatingStats> {
        self.with_conn(|conn| query_rating_stats(conn, novel_id))
    }

    pub fn get_review(&self, id: &str) -> Result<Option<ReviewRow>> {
        self.with_conn(|conn| query_review(conn, id))
    }

    /// Creates the reader's review of a novel, or overwrites the one they
    /// already left. The novel's aggregate rating is recomputed in the same
    /// transaction. Returns the stored review, whether an existing review was
    /// updated, and the new aggregate.
    pub fn upsert_review(
        &self,
        id: &str,
        novel_id: &str,
        user_id: &str,
        rating: i64,
        content: &str,
    ) -> Result<(ReviewRow, bool, RatingStats)> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM reviews WHERE novel_id = ?1 AND user_id = ?2",
                    (novel_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            let (review_id, updated) = match existing {
                Some(existing_id) => {
                    tx.execute(
                        "UPDATE reviews SET rating = ?2, content = ?3, updated_at = datetime('now')
                         WHERE id = ?1",
                        rusqlite::params![existing_id, rating, content],
                    )?;
                    (existing_id, true)
                }
                None => {
                    tx.execute(
                        "INSERT INTO reviews (id, novel_id, user_id, rating, content)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![id, novel_id, user_id, rating, content],
                    )?;
                    (id.to_string(), false)
                }
            };

            let stats = refresh_rating(&tx, novel_id)?;
            let review = query_review(&tx, &review_id)?
                .ok_or_else(|| anyhow::anyhow!("Review vanished after write: {}", review_id))?;

            tx.commit()?;
            Ok((review, updated, stats))
        })
    }

    /// Deletes a review and recomputes its novel's aggregate.
    pub fn delete_review(&self, id: &str) -> Result<Option<RatingStats>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let novel_id: Option<String> = tx
                .query_row("SELECT novel_id FROM reviews WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            let Some(novel_id) = novel_id else {
                return Ok(None);
            };

            tx.execute("DELETE FROM reviews WHERE id = ?1", [id])?;
            let stats = refresh_rating(&tx, &novel_id)?;
            tx.commit()?;
            Ok(Some(stats))
        })
    }
}

fn query_rating_stats(conn: &Connection, novel_id: &str) -> Result<RatingStats> {
    let stats = conn.query_row(
        "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM reviews WHERE novel_id = ?1",
        [novel_id],
        |row| {
            Ok(RatingStats {
                average_rating: row.get(0)?,
                total_ratings: row.get(1)?,
            })
        },
    )?;
    Ok(stats)
}

/// Writes the current aggregate back onto the novel row.
fn refresh_rating(conn: &Connection, novel_id: &str) -> Result<RatingStats> {
    let stats = query_rating_stats(conn, novel_id)?;
    conn.execute(
        "UPDATE novels SET average_rating = ?2, total_ratings = ?3 WHERE id = ?1",
        rusqlite::params![novel_id, stats.average_rating, stats.total_ratings],
    )?;
    Ok(stats)
}

fn query_review(conn: &Connection, id: &str) -> Result<Option<ReviewRow>> {
    let sql = format!("{REVIEW_SELECT} WHERE r.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_review).optional()?;
    Ok(row)
}

fn map_review(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "unknown".to_string()),
        rating: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "author");
        fixtures::user(&db, "alice");
        fixtures::user(&db, "bob");
        fixtures::novel(&db, "n1", "author", "Dragon Road");
        db
    }

    #[test]
    fn second_review_updates_instead_of_duplicating() {
        let db = setup();
        let (_, updated, stats) = db.upsert_review("r1", "n1", "alice", 2, "meh").unwrap();
        assert!(!updated);
        assert_eq!(stats.total_ratings, 1);

        let (review, updated, stats) = db.upsert_review("r2", "n1", "alice", 4, "grew on me").unwrap();
        assert!(updated);
        assert_eq!(review.id, "r1");
        assert_eq!(review.rating, 4);
        assert_eq!(stats, RatingStats { average_rating: 4.0, total_ratings: 1 });
        assert_eq!(db.list_reviews("n1", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn aggregate_is_written_to_the_novel() {
        let db = setup();
        db.upsert_review("r1", "n1", "alice", 5, "").unwrap();
        db.upsert_review("r2", "n1", "bob", 2, "").unwrap();

        let novel = db.get_novel("n1").unwrap().unwrap();
        assert_eq!(novel.total_ratings, 2);
        assert!((novel.average_rating - 3.5).abs() < f64::EPSILON);

        let stats = db.delete_review("r1").unwrap().unwrap();
        assert_eq!(stats.total_ratings, 1);
        assert!((stats.average_rating - 2.0).abs() < f64::EPSILON);

        db.delete_review("r2").unwrap();
        let novel = db.get_novel("n1").unwrap().unwrap();
        assert_eq!(novel.total_ratings, 0);
        assert_eq!(novel.average_rating, 0.0);
        assert!(db.delete_review("r2").unwrap().is_none());
    }

    #[test]
    fn rating_must_be_in_range() {
        let db = setup();
        assert!(db.upsert_review("r1", "n1", "alice", 6, "").is_err());
        assert_eq!(db.rating_stats("n1").unwrap().total_ratings, 0);
    }
}
