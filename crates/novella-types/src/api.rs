use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChapterStatus, NovelStatus, TransactionType, UserRole};

// -- JWT Claims --

/// Session token claims. Issued by the login/register handlers and checked
/// by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub wallet_coins: i64,
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// -- Shared --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}

/// Number of pages needed to show `total` items `per_page` at a time.
pub fn total_pages(total: i64, per_page: u32) -> u32 {
    if per_page == 0 || total <= 0 {
        return 0;
    }
    ((total as u64).div_ceil(per_page as u64)) as u32
}

// -- Novels --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub status: NovelStatus,
    pub is_adult: bool,
    pub view_count: i64,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub genres: Vec<Genre>,
    pub author: UserSummary,
    pub chapters_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NovelListResponse {
    pub novels: Vec<NovelSummary>,
    pub total_novels: i64,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Table-of-contents entry; never carries chapter content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterListing {
    pub id: Uuid,
    pub title: String,
    pub chapter_number: i64,
    pub view_count: i64,
    pub is_premium: bool,
    pub coins_cost: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NovelDetail {
    #[serde(flatten)]
    pub novel: NovelSummary,
    pub chapters: Vec<ChapterListing>,
}

// -- Author --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NovelRequest {
    pub title: String,
    pub description: String,
    pub status: NovelStatus,
    #[serde(default)]
    pub is_adult: bool,
    pub genres: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorNovel {
    #[serde(flatten)]
    pub novel: NovelSummary,
    /// Every chapter, drafts included. `chapters_count` counts published ones.
    pub total_chapters: i64,
    pub bookmarks_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorNovelListResponse {
    pub novels: Vec<AuthorNovel>,
    pub total_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverResponse {
    pub cover_image: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChapterRequest {
    pub title: String,
    pub content: String,
    pub chapter_number: i64,
    pub status: ChapterStatus,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub coins_cost: i64,
    pub word_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChapterStatusRequest {
    pub status: ChapterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub title: String,
    pub content: String,
    pub chapter_number: i64,
    pub status: ChapterStatus,
    pub is_premium: bool,
    pub coins_cost: i64,
    pub word_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChapterListResponse {
    pub chapters: Vec<Chapter>,
}

// -- Reading --

#[derive(Debug, Serialize, Deserialize)]
pub struct ChapterReadResponse {
    pub chapter: Chapter,
    pub novel: NovelSummary,
    /// False when `chapter.content` holds only the preview.
    pub can_access_premium: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub chapter_id: Uuid,
    pub amount: i64,
    pub wallet_coins: i64,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentThread>,
    pub total_comments: i64,
    pub total_pages: u32,
    pub current_page: u32,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub rating: i64,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub rating: i64,
    pub content: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review: Review,
    /// True when an earlier review by the same reader was overwritten.
    pub updated: bool,
    pub average_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<Review>,
    pub total_reviews: i64,
    pub total_pages: u32,
    pub current_page: u32,
    pub average_rating: f64,
    pub total_ratings: i64,
}

// -- Bookshelf --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookmarkRequest {
    pub novel_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookshelfStatus {
    pub in_bookshelf: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookshelfResponse {
    pub novels: Vec<NovelSummary>,
}

// -- Payments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRequest {
    pub amount: i64,
    pub payment_type: TransactionType,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: String,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub transaction: Transaction,
    pub wallet_coins: i64,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
}
