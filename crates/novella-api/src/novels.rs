use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use novella_db::{NovelFilter, NovelSort};
use novella_types::api::{GenreListResponse, NovelDetail, NovelListResponse, total_pages};

use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::{PathParams, QueryParams};
use crate::paging::Page;

const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct NovelListQuery {
    pub genre: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub timeframe: Option<String>,
    pub search: Option<String>,
}

impl NovelListQuery {
    /// Validate the query and turn it into a database filter.
    pub fn to_filter(&self) -> ApiResult<(NovelFilter, Page)> {
        let page = Page::new(self.page, self.limit, DEFAULT_LIMIT);

        let sort = match self.sort.as_deref() {
            None | Some("") => NovelSort::default(),
            Some(raw) => raw.parse::<NovelSort>().map_err(|e| {
                warn!("Rejected novel sort '{}'", raw);
                ApiError::bad_request(e.to_string())
            })?,
        };

        let descending = match self.order.as_deref() {
            None | Some("") | Some("desc") => true,
            Some("asc") => false,
            Some(other) => {
                return Err(ApiError::bad_request(format!("Unsupported order: {}", other)));
            }
        };

        let updated_within_days = match self.timeframe.as_deref() {
            None | Some("") | Some("all") => None,
            Some("week") => Some(7),
            Some("month") => Some(30),
            Some(other) => {
                return Err(ApiError::bad_request(format!("Unsupported timeframe: {}", other)));
            }
        };

        let genre = self
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("all"))
            .map(str::to_string);

        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let filter = NovelFilter {
            genre,
            search,
            updated_within_days,
            sort,
            descending,
            limit: page.limit,
            offset: page.offset(),
        };
        Ok((filter, page))
    }
}

/// GET /novels
pub async fn list_novels(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<NovelListQuery>,
) -> ApiResult<impl IntoResponse> {
    let (filter, page) = query.to_filter()?;

    let (rows, total, genre_rows) = with_db(&state, move |db| {
        let (rows, total) = db.list_novels(&filter)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let genre_rows = db.get_genres_for_novels(&ids)?;
        Ok((rows, total, genre_rows))
    })
    .await?;

    Ok(Json(NovelListResponse {
        novels: convert::novels(rows, genre_rows),
        total_novels: total,
        current_page: page.number,
        total_pages: total_pages(total, page.limit),
    }))
}

/// GET /novels/{id}
pub async fn get_novel(
    State(state): State<AppState>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let (row, genre_rows, chapters) = with_db(&state, move |db| {
        if !db.increment_novel_views(&nid)? {
            return Err(ApiError::not_found("Novel not found"));
        }
        let row = db
            .get_novel(&nid)?
            .ok_or_else(|| ApiError::not_found("Novel not found"))?;
        let genre_rows = db.get_genres_for_novels(std::slice::from_ref(&nid))?;
        let chapters = db.list_published_chapters(&nid)?;
        Ok((row, genre_rows, chapters))
    })
    .await?;

    let genres = convert::genres_by_novel(genre_rows)
        .remove(&row.id)
        .unwrap_or_default();

    Ok(Json(NovelDetail {
        novel: convert::novel(row, genres),
        chapters: chapters.into_iter().map(convert::chapter_listing).collect(),
    }))
}

/// GET /genres
pub async fn list_genres(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = with_db(&state, |db| Ok(db.list_genres()?)).await?;

    Ok(Json(GenreListResponse {
        genres: rows.into_iter().map(convert::genre).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sort: Option<&str>, order: Option<&str>, timeframe: Option<&str>) -> NovelListQuery {
        NovelListQuery {
            sort: sort.map(Into::into),
            order: order.map(Into::into),
            timeframe: timeframe.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_newest_first() {
        let (filter, page) = NovelListQuery::default().to_filter().unwrap();
        assert_eq!(filter.sort, NovelSort::CreatedAt);
        assert!(filter.descending);
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(page.number, 1);
        assert_eq!(filter.updated_within_days, None);
    }

    #[test]
    fn sort_is_whitelisted() {
        assert!(query(Some("view_count"), Some("asc"), None).to_filter().is_ok());
        assert!(matches!(
            query(Some("password"), None, None).to_filter(),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            query(None, Some("sideways"), None).to_filter(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn timeframe_maps_to_days() {
        let (filter, _) = query(None, None, Some("week")).to_filter().unwrap();
        assert_eq!(filter.updated_within_days, Some(7));
        let (filter, _) = query(None, None, Some("month")).to_filter().unwrap();
        assert_eq!(filter.updated_within_days, Some(30));
        assert!(query(None, None, Some("decade")).to_filter().is_err());
    }

    #[test]
    fn genre_all_means_no_filter() {
        let q = NovelListQuery {
            genre: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(q.to_filter().unwrap().0.genre, None);
    }
}
