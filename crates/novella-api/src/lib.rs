pub mod access;
pub mod auth;
pub mod author;
pub mod bookshelf;
pub mod chapters;
pub mod comments;
pub mod convert;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod novels;
pub mod paging;
pub mod payments;
pub mod reviews;
pub mod sanitize;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
};
use tower_http::services::ServeDir;

use crate::auth::AppState;
use crate::middleware::{identify, require_auth};
use crate::uploads::{MAX_COVER_SIZE, UPLOADS_PREFIX};

/// All HTTP routes. Transport-level layers (CORS, tracing) are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/genres", get(novels::list_genres))
        .route("/novels", get(novels::list_novels))
        .route("/novels/{id}", get(novels::get_novel))
        .route("/novels/{id}/reviews", get(reviews::list_reviews))
        .route("/chapters/{id}", get(chapters::read_chapter))
        .route("/chapters/{id}/comments", get(comments::list_comments))
        .route_layer(from_fn_with_state(state.clone(), identify));

    // Leave headroom over the cover limit so oversize uploads reach the
    // handler and get a JSON 413.
    let cover_upload = put(author::upload_cover).layer(DefaultBodyLimit::max(MAX_COVER_SIZE * 2));

    let protected_routes = Router::new()
        .route("/users/me", get(auth::me))
        .route("/users/bookshelf", get(bookshelf::list_bookshelf).post(bookshelf::add_to_bookshelf))
        .route(
            "/users/bookshelf/{novel_id}",
            get(bookshelf::bookshelf_status).delete(bookshelf::remove_from_bookshelf),
        )
        .route("/payments", get(payments::list_payments).post(payments::create_payment))
        .route("/novels/{id}/reviews", post(reviews::submit_review))
        .route("/novels/{id}/reviews/{review_id}", delete(reviews::delete_review))
        .route("/chapters/{id}/purchase", post(chapters::purchase_chapter))
        .route("/chapters/{id}/comments", post(comments::create_comment))
        .route(
            "/chapters/{id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
        .route("/author/novels", get(author::list_novels).post(author::create_novel))
        .route(
            "/author/novels/{id}",
            get(author::get_novel).put(author::update_novel).delete(author::delete_novel),
        )
        .route("/author/novels/{id}/cover", cover_upload)
        .route(
            "/author/novels/{id}/chapters",
            get(author::list_chapters).post(author::create_chapter),
        )
        .route(
            "/author/novels/{id}/chapters/{chapter_id}",
            get(author::get_chapter)
                .put(author::update_chapter)
                .delete(author::delete_chapter),
        )
        .route(
            "/author/novels/{id}/chapters/{chapter_id}/status",
            patch(author::set_chapter_status),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let uploads = ServeDir::new(state.storage.dir());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOADS_PREFIX, uploads)
        .with_state(state)
}
