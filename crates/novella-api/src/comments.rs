use std::collections::HashMap;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use novella_types::api::{
    Claims, Comment, CommentListResponse, CommentThread, CreateCommentRequest, total_pages,
};
use novella_types::models::UserRole;

use crate::auth::{AppState, with_db};
use crate::chapters::visible_chapter;
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::Viewer;
use crate::paging::PageQuery;

const DEFAULT_LIMIT: u32 = 20;
const MAX_COMMENT_CHARS: usize = 5000;

/// GET /chapters/{id}/comments
///
/// Threads on a draft chapter are only visible to the novel's author.
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    PathParams(chapter_id): PathParams<Uuid>,
    QueryParams(query): QueryParams<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = query.page(DEFAULT_LIMIT);
    let cid = chapter_id.to_string();
    let viewer_id = viewer.claims().map(|c| c.sub.to_string());

    let (roots, replies, total) = with_db(&state, move |db| {
        visible_chapter(db, &cid, viewer_id.as_deref())?;
        let roots = db.list_root_comments(&cid, page.limit, page.offset())?;
        let root_ids: Vec<String> = roots.iter().map(|r| r.id.clone()).collect();
        let replies = db.get_replies(&root_ids)?;
        let total = db.count_root_comments(&cid)?;
        Ok((roots, replies, total))
    })
    .await?;

    // Group replies under their parent, preserving oldest-first order
    let mut reply_map: HashMap<String, Vec<Comment>> = HashMap::new();
    for row in replies {
        match row.parent_id.clone() {
            Some(parent) => reply_map.entry(parent).or_default().push(convert::comment(row)),
            None => warn!("Reply query returned root comment {}", row.id),
        }
    }

    let comments = roots
        .into_iter()
        .map(|row| {
            let replies = reply_map.remove(&row.id).unwrap_or_default();
            CommentThread {
                comment: convert::comment(row),
                replies,
            }
        })
        .collect();

    Ok(Json(CommentListResponse {
        comments,
        total_comments: total,
        total_pages: total_pages(total, page.limit),
        current_page: page.number,
    }))
}

/// POST /chapters/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams(chapter_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(ApiError::bad_request(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let cid = chapter_id.to_string();
    let uid = claims.sub.to_string();
    let parent_id = req.parent_id.map(|p| p.to_string());
    let comment_id = Uuid::new_v4().to_string();

    let row = with_db(&state, move |db| {
        visible_chapter(db, &cid, Some(uid.as_str()))?;

        if let Some(parent_id) = &parent_id {
            let parent = db
                .get_comment(parent_id)?
                .filter(|p| p.chapter_id == cid)
                .ok_or_else(|| ApiError::not_found("Parent comment not found"))?;
            if parent.parent_id.is_some() {
                return Err(ApiError::bad_request("Replies cannot be replied to"));
            }
        }

        Ok(db.create_comment(&comment_id, &cid, &uid, parent_id.as_deref(), &content)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::comment(row))))
}

/// DELETE /chapters/{id}/comments/{comment_id}
///
/// Allowed for the comment's writer, admins, and the author of the novel the
/// chapter belongs to. Direct replies are removed too.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParams((chapter_id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let cid = chapter_id.to_string();
    let mid = comment_id.to_string();
    let uid = claims.sub.to_string();

    let deleted = with_db(&state, move |db| {
        let comment = db
            .get_comment(&mid)?
            .filter(|c| c.chapter_id == cid)
            .ok_or_else(|| ApiError::not_found("Comment not found"))?;

        if comment.user_id != uid {
            // The token's role may be stale, so check the stored one
            let is_admin = db
                .get_user_by_id(&uid)?
                .is_some_and(|u| convert::role(&u.role) == UserRole::Admin);
            let novel_author = db
                .get_chapter(&cid)?
                .map(|chapter| chapter.novel_id)
                .map(|novel_id| db.get_novel(&novel_id))
                .transpose()?
                .flatten()
                .map(|novel| novel.author_id);

            if !is_admin && novel_author.as_deref() != Some(uid.as_str()) {
                return Err(ApiError::forbidden("You cannot delete this comment"));
            }
        }

        Ok(db.delete_comment_thread(&mid)?)
    })
    .await?;

    info!("User {} deleted comment {} ({} removed)", claims.sub, comment_id, deleted);
    Ok(Json(json!({ "deleted": deleted })))
}
