/// Database row types — these map directly to SQLite rows.
/// Distinct from novella-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub wallet_coins: i64,
    pub premium_until: Option<String>,
    pub created_at: String,
}

pub struct GenreRow {
    pub id: i64,
    pub name: String,
}

/// A genre attached to a novel, as returned by batch lookups.
pub struct NovelGenreRow {
    pub novel_id: String,
    pub genre_id: i64,
    pub name: String,
}

pub struct NovelRow {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub status: String,
    pub is_adult: bool,
    pub view_count: i64,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub published_chapters: i64,
    pub total_chapters: i64,
    pub bookmarks_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ChapterRow {
    pub id: String,
    pub novel_id: String,
    pub title: String,
    pub content: String,
    pub chapter_number: i64,
    pub status: String,
    pub is_premium: bool,
    pub coins_cost: i64,
    pub word_count: i64,
    pub view_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Chapter without its content, for tables of contents.
pub struct ChapterListingRow {
    pub id: String,
    pub title: String,
    pub chapter_number: i64,
    pub view_count: i64,
    pub is_premium: bool,
    pub coins_cost: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub chapter_id: String,
    pub parent_id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: String,
}

pub struct ReviewRow {
    pub id: String,
    pub novel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub transaction_type: String,
    pub status: String,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub created_at: String,
}

/// Aggregate rating of a novel after a review write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_ratings: i64,
}
