use anyhow::Result;

use super::placeholders;
use crate::models::{GenreRow, NovelGenreRow};
use crate::Database;

impl Database {
    pub fn list_genres(&self) -> Result<Vec<GenreRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM genres ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GenreRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the ids from `ids` that do not name an existing genre.
    pub fn missing_genres(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!("SELECT id FROM genres WHERE id IN ({})", placeholders(ids.len()));
            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
        })
    }

    /// Batch-fetch the genres of a set of novels.
    pub fn get_genres_for_novels(&self, novel_ids: &[String]) -> Result<Vec<NovelGenreRow>> {
        if novel_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT ng.novel_id, g.id, g.name
                 FROM novel_genres ng
                 JOIN genres g ON g.id = ng.genre_id
                 WHERE ng.novel_id IN ({})
                 ORDER BY g.name ASC",
                placeholders(novel_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(novel_ids.iter()), |row| {
                    Ok(NovelGenreRow {
                        novel_id: row.get(0)?,
                        genre_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
