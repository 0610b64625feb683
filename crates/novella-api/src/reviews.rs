use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use novella_db::Database;
use novella_types::api::{Claims, ReviewListResponse, ReviewRequest, ReviewResponse, total_pages};
use novella_types::models::UserRole;

use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::paging::PageQuery;

const DEFAULT_LIMIT: u32 = 10;
const MAX_REVIEW_CHARS: usize = 10_000;

fn require_novel(db: &Database, novel_id: &str) -> ApiResult<()> {
    db.get_novel(novel_id)?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Novel not found"))
}

/// GET /novels/{id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    PathParams(novel_id): PathParams<Uuid>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = query.page(DEFAULT_LIMIT);
    let nid = novel_id.to_string();

    let (rows, stats) = with_db(&state, move |db| {
        require_novel(db, &nid)?;
        let rows = db.list_reviews(&nid, page.limit, page.offset())?;
        let stats = db.rating_stats(&nid)?;
        Ok((rows, stats))
    })
    .await?;

    Ok(Json(ReviewListResponse {
        reviews: rows.into_iter().map(convert::review).collect(),
        total_reviews: stats.total_ratings,
        total_pages: total_pages(stats.total_ratings, page.limit),
        current_page: page.number,
        average_rating: stats.average_rating,
        total_ratings: stats.total_ratings,
    }))
}

/// POST /novels/{id}/reviews
///
/// A reader has at most one review per novel; posting again replaces it.
pub async fn submit_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(novel_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    let content = req.content.unwrap_or_default().trim().to_string();
    if content.chars().count() > MAX_REVIEW_CHARS {
        return Err(ApiError::bad_request(format!(
            "Review must be at most {} characters",
            MAX_REVIEW_CHARS
        )));
    }

    let nid = novel_id.to_string();
    let uid = claims.sub.to_string();
    let review_id = Uuid::new_v4().to_string();
    let rating = req.rating;

    let (row, updated, stats) = with_db(&state, move |db| {
        require_novel(db, &nid)?;
        Ok(db.upsert_review(&review_id, &nid, &uid, rating, &content)?)
    })
    .await?;

    info!(
        "User {} {} review of novel {} (avg {:.2} over {})",
        claims.sub,
        if updated { "updated" } else { "posted" },
        novel_id,
        stats.average_rating,
        stats.total_ratings
    );

    let status = if updated { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(ReviewResponse {
            review: convert::review(row),
            updated,
            average_rating: stats.average_rating,
            total_ratings: stats.total_ratings,
        }),
    ))
}

/// DELETE /novels/{id}/reviews/{review_id}
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((novel_id, review_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let nid = novel_id.to_string();
    let rid = review_id.to_string();
    let uid = claims.sub.to_string();

    let stats = with_db(&state, move |db| {
        let review = db
            .get_review(&rid)?
            .filter(|r| r.novel_id == nid)
            .ok_or_else(|| ApiError::not_found("Review not found"))?;

        if review.user_id != uid {
            let is_admin = db
                .get_user_by_id(&uid)?
                .is_some_and(|u| convert::role(&u.role) == UserRole::Admin);
            if !is_admin {
                return Err(ApiError::forbidden("You cannot delete this review"));
            }
        }

        db.delete_review(&rid)?
            .ok_or_else(|| ApiError::not_found("Review not found"))
    })
    .await?;

    Ok(Json(json!({
        "average_rating": stats.average_rating,
        "total_ratings": stats.total_ratings,
    })))
}
