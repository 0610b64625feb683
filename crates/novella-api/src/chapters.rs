use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use novella_db::models::{ChapterRow, NovelRow};
use novella_db::{Database, PurchaseOutcome};
use novella_types::api::{ChapterReadResponse, Claims, PurchaseResponse};
use novella_types::models::ChapterStatus;

use crate::access::{self, Reader};
use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::PathParams;
use crate::middleware::Viewer;

fn is_draft(chapter: &ChapterRow) -> bool {
    chapter.status == ChapterStatus::Draft.as_str()
}

/// Load a chapter and its novel, hiding drafts from everyone but the author.
pub(crate) fn visible_chapter(
    db: &Database,
    chapter_id: &str,
    viewer_id: Option<&str>,
) -> ApiResult<(ChapterRow, NovelRow)> {
    let chapter = db
        .get_chapter(chapter_id)?
        .ok_or_else(|| ApiError::not_found("Chapter not found"))?;
    let novel = db
        .get_novel(&chapter.novel_id)?
        .ok_or_else(|| ApiError::not_found("Novel not found"))?;

    if is_draft(&chapter) && viewer_id != Some(novel.author_id.as_str()) {
        return Err(ApiError::forbidden("This chapter is not published"));
    }
    Ok((chapter, novel))
}

/// Whether `viewer_id` may read the full text of `chapter`.
fn viewer_can_read(db: &Database, chapter: &ChapterRow, novel: &NovelRow, viewer_id: Option<&str>) -> ApiResult<bool> {
    if !chapter.is_premium {
        return Ok(true);
    }
    let Some(user_id) = viewer_id else {
        return Ok(false);
    };

    let premium_until = db
        .get_user_by_id(user_id)?
        .and_then(|user| user.premium_until)
        .map(|raw| convert::timestamp(&raw, "premium_until"));
    let reader = Reader {
        user_id,
        premium_until,
        has_purchase: db.has_purchase(user_id, &chapter.id)?,
    };

    Ok(access::can_read_premium(Some(&reader), &novel.author_id, Utc::now()))
}

/// GET /chapters/{id}
pub async fn read_chapter(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    PathParams(chapter_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let cid = chapter_id.to_string();
    let viewer_id = viewer.claims().map(|c| c.sub.to_string());

    let (mut chapter, novel, genre_rows, can_access) = with_db(&state, move |db| {
        let viewer_id = viewer_id.as_deref();
        let (mut chapter, novel) = visible_chapter(db, &cid, viewer_id)?;
        if db.increment_chapter_views(&cid)? {
            chapter.view_count += 1;
        }
        let can_access = viewer_can_read(db, &chapter, &novel, viewer_id)?;
        let genre_rows = db.get_genres_for_novels(std::slice::from_ref(&novel.id))?;
        Ok((chapter, novel, genre_rows, can_access))
    })
    .await?;

    if !can_access {
        chapter.content = access::preview(&chapter.content);
    }

    let genres = convert::genres_by_novel(genre_rows)
        .remove(&novel.id)
        .unwrap_or_default();

    Ok(Json(ChapterReadResponse {
        chapter: convert::chapter(chapter),
        novel: convert::novel(novel, genres),
        can_access_premium: can_access,
    }))
}

/// POST /chapters/{id}/purchase
pub async fn purchase_chapter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(chapter_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let cid = chapter_id.to_string();
    let uid = claims.sub.to_string();

    let (cost, outcome) = with_db(&state, move |db| {
        let (chapter, novel) = visible_chapter(db, &cid, Some(uid.as_str()))?;
        if !chapter.is_premium {
            return Err(ApiError::bad_request("This chapter is free to read"));
        }
        if novel.author_id == uid {
            return Err(ApiError::conflict("You cannot buy your own chapter"));
        }

        let tx_id = Uuid::new_v4().to_string();
        let outcome = db.purchase_chapter(&tx_id, &uid, &cid, chapter.coins_cost)?;
        Ok((chapter.coins_cost, outcome))
    })
    .await?;

    match outcome {
        PurchaseOutcome::Purchased { wallet_coins } => {
            info!("User {} bought chapter {} for {} coins", claims.sub, chapter_id, cost);
            Ok((
                StatusCode::CREATED,
                Json(PurchaseResponse {
                    chapter_id,
                    amount: cost,
                    wallet_coins,
                }),
            ))
        }
        PurchaseOutcome::AlreadyOwned => Err(ApiError::conflict("Chapter already purchased")),
        PurchaseOutcome::InsufficientFunds { wallet_coins } => Err(ApiError::PaymentRequired(format!(
            "Chapter costs {} coins but the wallet holds {}",
            cost, wallet_coins
        ))),
    }
}
