//! Novel and chapter management for the novel's author.
//!
//! Every route is scoped to novels the caller owns. A novel that is missing
//! or belongs to someone else is reported as 404 so ids can't be probed.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use novella_db::models::{ChapterRow, NovelGenreRow, NovelRow};
use novella_db::{Database, NewChapter, NewNovel};
use novella_types::api::{
    AuthorNovel, AuthorNovelListResponse, ChapterListResponse, ChapterRequest,
    ChapterStatusRequest, Claims, CoverResponse, NovelRequest,
};
use novella_types::models::NovelStatus;

use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::paging::MAX_PAGE_SIZE;
use crate::sanitize::{sanitize_content, word_count};
use crate::uploads::{ImageKind, MAX_COVER_SIZE};

#[derive(Debug, Default, Deserialize)]
pub struct AuthorNovelQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

fn owned_novel(db: &Database, novel_id: &str, user_id: &str) -> ApiResult<NovelRow> {
    match db.get_novel(novel_id)? {
        Some(row) if row.author_id == user_id => Ok(row),
        _ => Err(ApiError::not_found("Novel not found")),
    }
}

fn owned_chapter(db: &Database, novel_id: &str, chapter_id: &str, user_id: &str) -> ApiResult<ChapterRow> {
    owned_novel(db, novel_id, user_id)?;
    match db.get_chapter(chapter_id)? {
        Some(row) if row.novel_id == novel_id => Ok(row),
        _ => Err(ApiError::not_found("Chapter not found")),
    }
}

/// Reload a novel with its genres in the author-facing shape.
fn load_author_novel(db: &Database, novel_id: &str) -> ApiResult<AuthorNovel> {
    let row = db
        .get_novel(novel_id)?
        .ok_or_else(|| ApiError::not_found("Novel not found"))?;
    let genre_rows = db.get_genres_for_novels(&[row.id.clone()])?;
    author_novels(vec![row], genre_rows)
        .pop()
        .ok_or_else(|| ApiError::not_found("Novel not found"))
}

fn author_novels(rows: Vec<NovelRow>, genre_rows: Vec<NovelGenreRow>) -> Vec<AuthorNovel> {
    let mut genres = convert::genres_by_novel(genre_rows);
    rows.into_iter()
        .map(|row| {
            let (total_chapters, bookmarks_count) = (row.total_chapters, row.bookmarks_count);
            let g = genres.remove(&row.id).unwrap_or_default();
            AuthorNovel {
                novel: convert::novel(row, g),
                total_chapters,
                bookmarks_count,
            }
        })
        .collect()
}

/// Check a create/update body and build the row to store.
fn validate_novel(req: NovelRequest, id: String, author_id: String) -> ApiResult<NewNovel> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();

    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if description.is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }

    let mut genre_ids = req.genres;
    genre_ids.sort_unstable();
    genre_ids.dedup();
    if genre_ids.is_empty() {
        return Err(ApiError::bad_request("At least one genre is required"));
    }

    Ok(NewNovel {
        id,
        author_id,
        title,
        description,
        status: req.status.as_str().to_string(),
        is_adult: req.is_adult,
        genre_ids,
    })
}

fn check_genres_exist(db: &Database, genre_ids: &[i64]) -> ApiResult<()> {
    let missing = db.missing_genres(genre_ids)?;
    if let Some(first) = missing.first() {
        return Err(ApiError::bad_request(format!("Unknown genre: {}", first)));
    }
    Ok(())
}

/// Check a chapter body, sanitize its content and build the row to store.
fn validate_chapter(req: ChapterRequest, id: String, novel_id: String) -> ApiResult<NewChapter> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if req.chapter_number < 1 {
        return Err(ApiError::bad_request("Chapter number must be at least 1"));
    }
    if req.coins_cost < 0 {
        return Err(ApiError::bad_request("Coin cost cannot be negative"));
    }
    if req.is_premium && req.coins_cost == 0 {
        return Err(ApiError::bad_request("Premium chapters must cost at least one coin"));
    }
    if req.word_count.is_some_and(|n| n < 0) {
        return Err(ApiError::bad_request("Word count cannot be negative"));
    }

    let content = sanitize_content(&req.content);
    let word_count = req.word_count.unwrap_or_else(|| word_count(&content));

    Ok(NewChapter {
        id,
        novel_id,
        title,
        content,
        chapter_number: req.chapter_number,
        status: req.status.as_str().to_string(),
        is_premium: req.is_premium,
        coins_cost: if req.is_premium { req.coins_cost } else { 0 },
        word_count,
    })
}

// -- Novels --

/// GET /author/novels
pub async fn list_novels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    QueryParams(query): QueryParams<AuthorNovelQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<NovelStatus>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
        ),
    };
    let limit = query.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE));
    let skip = query.skip.unwrap_or(0);
    let uid = claims.sub.to_string();

    let (rows, total, genre_rows) = with_db(&state, move |db| {
        let (rows, total) = db.list_author_novels(&uid, status.as_ref().map(NovelStatus::as_str), limit, skip)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let genre_rows = db.get_genres_for_novels(&ids)?;
        Ok((rows, total, genre_rows))
    })
    .await?;

    Ok(Json(AuthorNovelListResponse {
        novels: author_novels(rows, genre_rows),
        total_count: total,
    }))
}

/// POST /author/novels
pub async fn create_novel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<NovelRequest>,
) -> ApiResult<impl IntoResponse> {
    let novel_id = Uuid::new_v4();
    let novel = validate_novel(req, novel_id.to_string(), claims.sub.to_string())?;

    let created = with_db(&state, move |db| {
        check_genres_exist(db, &novel.genre_ids)?;
        db.create_novel(&novel)?;
        if db.promote_to_author(&novel.author_id)? {
            info!("User {} promoted to author", novel.author_id);
        }
        load_author_novel(db, &novel.id)
    })
    .await?;

    info!("User {} created novel {}", claims.sub, novel_id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /author/novels/{id}
pub async fn get_novel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let uid = claims.sub.to_string();

    let novel = with_db(&state, move |db| {
        owned_novel(db, &nid, &uid)?;
        load_author_novel(db, &nid)
    })
    .await?;

    Ok(Json(novel))
}

/// PUT /author/novels/{id}
pub async fn update_novel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<NovelRequest>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let novel = validate_novel(req, novel_id.to_string(), uid.clone())?;

    let updated = with_db(&state, move |db| {
        owned_novel(db, &novel.id, &uid)?;
        check_genres_exist(db, &novel.genre_ids)?;
        db.update_novel(&novel)?;
        load_author_novel(db, &novel.id)
    })
    .await?;

    Ok(Json(updated))
}

/// DELETE /author/novels/{id}
pub async fn delete_novel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let uid = claims.sub.to_string();

    let cover = with_db(&state, move |db| {
        let row = owned_novel(db, &nid, &uid)?;
        db.delete_novel(&nid)?;
        Ok(row.cover_image)
    })
    .await?;

    if let Some(url) = cover {
        // The row is gone either way; a stray file is only worth a warning.
        if let Err(e) = state.storage.delete_by_url(&url).await {
            warn!("Failed to delete cover {} of novel {}: {:#}", url, novel_id, e);
        }
    }

    info!("User {} deleted novel {}", claims.sub, novel_id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /author/novels/{id}/cover
///
/// Body is the raw image. JPEG, PNG, GIF and WebP are accepted.
pub async fn upload_cover(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let uid = claims.sub.to_string();
    with_db(&state, move |db| owned_novel(db, &nid, &uid).map(|_| ())).await?;

    if body.is_empty() {
        return Err(ApiError::bad_request("Cover image is empty"));
    }
    if body.len() > MAX_COVER_SIZE {
        warn!("Rejected {} byte cover for novel {}", body.len(), novel_id);
        return Err(ApiError::PayloadTooLarge(format!(
            "Cover image must be at most {} bytes",
            MAX_COVER_SIZE
        )));
    }
    let kind = ImageKind::detect(&body)
        .ok_or_else(|| ApiError::bad_request("Cover must be a JPEG, PNG, GIF or WebP image"))?;

    let url = state.storage.save_cover(&novel_id.to_string(), &body, kind).await?;

    let nid = novel_id.to_string();
    let new_url = url.clone();
    let previous = with_db(&state, move |db| Ok(db.set_novel_cover(&nid, &new_url)?)).await?;

    if let Some(old) = previous.filter(|old| *old != url) {
        if let Err(e) = state.storage.delete_by_url(&old).await {
            warn!("Failed to delete replaced cover {}: {:#}", old, e);
        }
    }

    Ok(Json(CoverResponse { cover_image: url }))
}

// -- Chapters --

/// GET /author/novels/{id}/chapters
pub async fn list_chapters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let uid = claims.sub.to_string();

    let rows = with_db(&state, move |db| {
        owned_novel(db, &nid, &uid)?;
        Ok(db.list_chapters(&nid)?)
    })
    .await?;

    Ok(Json(ChapterListResponse {
        chapters: rows.into_iter().map(convert::chapter).collect(),
    }))
}

/// POST /author/novels/{id}/chapters
pub async fn create_chapter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<ChapterRequest>,
) -> ApiResult<impl IntoResponse> {
    let chapter = validate_chapter(req, Uuid::new_v4().to_string(), novel_id.to_string())?;
    let uid = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        owned_novel(db, &chapter.novel_id, &uid)?;
        if db.chapter_number_taken(&chapter.novel_id, chapter.chapter_number, None)? {
            return Err(ApiError::conflict(format!(
                "Chapter {} already exists",
                chapter.chapter_number
            )));
        }
        db.create_chapter(&chapter)?;
        db.get_chapter(&chapter.id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("chapter vanished after insert: {}", chapter.id)))
    })
    .await?;

    info!("Chapter {} added to novel {}", row.chapter_number, novel_id);
    Ok((StatusCode::CREATED, Json(convert::chapter(row))))
}

/// GET /author/novels/{id}/chapters/{chapter_id}
pub async fn get_chapter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((novel_id, chapter_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let cid = chapter_id.to_string();
    let uid = claims.sub.to_string();

    let row = with_db(&state, move |db| owned_chapter(db, &nid, &cid, &uid)).await?;
    Ok(Json(convert::chapter(row)))
}

/// PUT /author/novels/{id}/chapters/{chapter_id}
pub async fn update_chapter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((novel_id, chapter_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(req): JsonBody<ChapterRequest>,
) -> ApiResult<impl IntoResponse> {
    let chapter = validate_chapter(req, chapter_id.to_string(), novel_id.to_string())?;
    let uid = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        owned_chapter(db, &chapter.novel_id, &chapter.id, &uid)?;
        if db.chapter_number_taken(&chapter.novel_id, chapter.chapter_number, Some(&chapter.id))? {
            return Err(ApiError::conflict(format!(
                "Chapter {} already exists",
                chapter.chapter_number
            )));
        }
        db.update_chapter(&chapter)?;
        db.get_chapter(&chapter.id)?
            .ok_or_else(|| ApiError::not_found("Chapter not found"))
    })
    .await?;

    Ok(Json(convert::chapter(row)))
}

/// PATCH /author/novels/{id}/chapters/{chapter_id}/status
pub async fn set_chapter_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((novel_id, chapter_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(req): JsonBody<ChapterStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let cid = chapter_id.to_string();
    let uid = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        owned_chapter(db, &nid, &cid, &uid)?;
        db.set_chapter_status(&cid, req.status.as_str())?;
        db.get_chapter(&cid)?
            .ok_or_else(|| ApiError::not_found("Chapter not found"))
    })
    .await?;

    info!("Chapter {} is now {}", chapter_id, row.status);
    Ok(Json(convert::chapter(row)))
}

/// DELETE /author/novels/{id}/chapters/{chapter_id}
pub async fn delete_chapter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((novel_id, chapter_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let cid = chapter_id.to_string();
    let uid = claims.sub.to_string();

    with_db(&state, move |db| {
        owned_chapter(db, &nid, &cid, &uid)?;
        db.delete_chapter(&cid)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
