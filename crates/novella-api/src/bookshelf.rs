use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::debug;
use uuid::Uuid;

use novella_types::api::{BookmarkRequest, BookshelfResponse, BookshelfStatus, Claims};

use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParams};

/// GET /users/bookshelf
pub async fn list_bookshelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();

    let (rows, genre_rows) = with_db(&state, move |db| {
        let rows = db.list_bookmarked_novels(&uid)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let genre_rows = db.get_genres_for_novels(&ids)?;
        Ok((rows, genre_rows))
    })
    .await?;

    Ok(Json(BookshelfResponse {
        novels: convert::novels(rows, genre_rows),
    }))
}

/// GET /users/bookshelf/{novel_id}
pub async fn bookshelf_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let nid = novel_id.to_string();

    let in_bookshelf = with_db(&state, move |db| Ok(db.is_bookmarked(&uid, &nid)?)).await?;
    Ok(Json(BookshelfStatus { in_bookshelf }))
}

/// POST /users/bookshelf
pub async fn add_to_bookshelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<BookmarkRequest>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let nid = req.novel_id.to_string();

    let added = with_db(&state, move |db| {
        if db.get_novel(&nid)?.is_none() {
            return Err(ApiError::not_found("Novel not found"));
        }
        Ok(db.add_bookmark(&uid, &nid)?)
    })
    .await?;

    if !added {
        debug!("Novel {} already on bookshelf of {}", req.novel_id, claims.sub);
    }
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(BookshelfStatus { in_bookshelf: true })))
}

/// DELETE /users/bookshelf/{novel_id}
pub async fn remove_from_bookshelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let nid = novel_id.to_string();

    with_db(&state, move |db| Ok(db.remove_bookmark(&uid, &nid)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
