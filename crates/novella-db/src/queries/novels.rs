use std::str::FromStr;

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::NovelRow;
use crate::Database;

/// Shared projection for every novel query. Must stay in sync with `map_novel`.
pub(crate) const NOVEL_SELECT: &str = "
    SELECT n.id, n.author_id, u.name, n.title, n.description, n.cover_image, n.status,
           n.is_adult, n.view_count, n.average_rating, n.total_ratings,
           (SELECT COUNT(*) FROM chapters c WHERE c.novel_id = n.id AND c.status = 'PUBLISHED'),
           (SELECT COUNT(*) FROM chapters c WHERE c.novel_id = n.id),
           (SELECT COUNT(*) FROM bookmarks b WHERE b.novel_id = n.id),
           n.created_at, n.updated_at
    FROM novels n
    LEFT JOIN users u ON n.author_id = u.id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NovelSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    ViewCount,
    AverageRating,
    Title,
}

impl NovelSort {
    fn column(&self) -> &'static str {
        match self {
            NovelSort::CreatedAt => "n.created_at",
            NovelSort::UpdatedAt => "n.updated_at",
            NovelSort::ViewCount => "n.view_count",
            NovelSort::AverageRating => "n.average_rating",
            NovelSort::Title => "n.title COLLATE NOCASE",
        }
    }
}

impl FromStr for NovelSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // camelCase spellings are what older clients send
        match s {
            "created_at" | "createdAt" => Ok(NovelSort::CreatedAt),
            "updated_at" | "updatedAt" => Ok(NovelSort::UpdatedAt),
            "view_count" | "viewCount" => Ok(NovelSort::ViewCount),
            "average_rating" | "averageRating" => Ok(NovelSort::AverageRating),
            "title" => Ok(NovelSort::Title),
            other => Err(anyhow::anyhow!("Unsupported sort field: {}", other)),
        }
    }
}

/// Filters for the public novel listing.
#[derive(Debug, Clone, Default)]
pub struct NovelFilter {
    /// Genre id or genre name.
    pub genre: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Only novels updated within this many days.
    pub updated_within_days: Option<u32>,
    pub sort: NovelSort,
    pub descending: bool,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug)]
pub struct NewNovel {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub is_adult: bool,
    pub genre_ids: Vec<i64>,
}

impl Database {
    /// Public listing. Returns one page of novels and the total match count.
    pub fn list_novels(&self, filter: &NovelFilter) -> Result<(Vec<NovelRow>, i64)> {
        self.with_conn(|conn| {
            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<Value> = Vec::new();

            if let Some(genre) = &filter.genre {
                params.push(Value::Text(genre.clone()));
                let idx = params.len();
                clauses.push(format!(
                    "EXISTS (SELECT 1 FROM novel_genres ng JOIN genres g ON g.id = ng.genre_id
                             WHERE ng.novel_id = n.id AND (g.name = ?{idx} OR CAST(g.id AS TEXT) = ?{idx}))"
                ));
            }

            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
                params.push(Value::Text(pattern));
                let idx = params.len();
                clauses.push(format!(
                    "(fold_case(n.title) LIKE ?{idx} ESCAPE '\\' \
                     OR fold_case(n.description) LIKE ?{idx} ESCAPE '\\')"
                ));
            }

            if let Some(days) = filter.updated_within_days {
                params.push(Value::Text(format!("-{} days", days)));
                clauses.push(format!("n.updated_at >= datetime('now', ?{})", params.len()));
            }

            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM novels n{}", where_sql),
                rusqlite::params_from_iter(params.iter()),
                |row| row.get(0),
            )?;

            let direction = if filter.descending { "DESC" } else { "ASC" };
            params.push(Value::Integer(filter.limit as i64));
            let limit_idx = params.len();
            params.push(Value::Integer(filter.offset as i64));
            let offset_idx = params.len();

            let sql = format!(
                "{NOVEL_SELECT}{where_sql}
                 ORDER BY {column} {direction}, n.rowid {direction}
                 LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
                column = filter.sort.column(),
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_novel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    pub fn get_novel(&self, id: &str) -> Result<Option<NovelRow>> {
        self.with_conn(|conn| query_novel(conn, id))
    }

    /// Returns false if the novel does not exist.
    pub fn increment_novel_views(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE novels SET view_count = view_count + 1 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Novels owned by `author_id`, newest first.
    pub fn list_author_novels(
        &self,
        author_id: &str,
        status: Option<&str>,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<(Vec<NovelRow>, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM novels n WHERE n.author_id = ?1 AND (?2 IS NULL OR n.status = ?2)",
                rusqlite::params![author_id, status],
                |row| row.get(0),
            )?;

            // LIMIT -1 means no limit in SQLite
            let limit = limit.map(i64::from).unwrap_or(-1);
            let sql = format!(
                "{NOVEL_SELECT}
                 WHERE n.author_id = ?1 AND (?2 IS NULL OR n.status = ?2)
                 ORDER BY n.created_at DESC, n.rowid DESC
                 LIMIT ?3 OFFSET ?4"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![author_id, status, limit, offset], map_novel)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    pub fn create_novel(&self, novel: &NewNovel) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO novels (id, author_id, title, description, status, is_adult)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    novel.id,
                    novel.author_id,
                    novel.title,
                    novel.description,
                    novel.status,
                    novel.is_adult,
                ],
            )?;
            insert_genres(&tx, &novel.id, &novel.genre_ids)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Replaces the editable fields and the genre set. `author_id` is ignored.
    pub fn update_novel(&self, novel: &NewNovel) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE novels
                 SET title = ?2, description = ?3, status = ?4, is_adult = ?5,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![
                    novel.id,
                    novel.title,
                    novel.description,
                    novel.status,
                    novel.is_adult,
                ],
            )?;
            tx.execute("DELETE FROM novel_genres WHERE novel_id = ?1", [&novel.id])?;
            insert_genres(&tx, &novel.id, &novel.genre_ids)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Sets the cover URL and returns the one it replaced.
    pub fn set_novel_cover(&self, id: &str, cover_image: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let previous: Option<String> = conn
                .query_row("SELECT cover_image FROM novels WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?
                .flatten();

            conn.execute(
                "UPDATE novels SET cover_image = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, cover_image),
            )?;
            Ok(previous)
        })
    }

    /// Deletes a novel; chapters, comments, reviews, bookmarks and purchases
    /// go with it through the foreign key cascades.
    pub fn delete_novel(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM novels WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

pub(crate) fn query_novel(conn: &Connection, id: &str) -> Result<Option<NovelRow>> {
    let sql = format!("{NOVEL_SELECT} WHERE n.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_novel).optional()?;
    Ok(row)
}

pub(crate) fn touch_novel(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE novels SET updated_at = datetime('now') WHERE id = ?1",
        [id],
    )?;
    Ok(())
}

pub(crate) fn map_novel(row: &Row<'_>) -> rusqlite::Result<NovelRow> {
    Ok(NovelRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "unknown".to_string()),
        title: row.get(3)?,
        description: row.get(4)?,
        cover_image: row.get(5)?,
        status: row.get(6)?,
        is_adult: row.get(7)?,
        view_count: row.get(8)?,
        average_rating: row.get(9)?,
        total_ratings: row.get(10)?,
        published_chapters: row.get(11)?,
        total_chapters: row.get(12)?,
        bookmarks_count: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn insert_genres(conn: &Connection, novel_id: &str, genre_ids: &[i64]) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO novel_genres (novel_id, genre_id) VALUES (?1, ?2)")?;
    for genre_id in genre_ids {
        stmt.execute(rusqlite::params![novel_id, genre_id])?;
    }
    Ok(())
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
