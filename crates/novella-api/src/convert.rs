//! Database rows to API types.
//!
//! Rows come back with ids and timestamps as text. A value that fails to parse
//! is logged and replaced with its default rather than failing the request.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use novella_db::models::{
    ChapterListingRow, ChapterRow, CommentRow, GenreRow, NovelGenreRow, NovelRow, ReviewRow,
    TransactionRow, UserRow,
};
use novella_types::api::{
    Chapter, ChapterListing, Comment, Genre, NovelSummary, Review, Transaction, UserProfile,
    UserSummary,
};
use novella_types::models::{ChapterStatus, NovelStatus, TransactionType, UserRole};

pub fn uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    novella_db::parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}'", what, raw);
        DateTime::default()
    })
}

fn enum_or<T: std::str::FromStr>(raw: &str, what: &str, fallback: T) -> T {
    raw.parse().unwrap_or_else(|_| {
        warn!("Corrupt {} '{}'", what, raw);
        fallback
    })
}

pub fn role(raw: &str) -> UserRole {
    enum_or(raw, "user role", UserRole::Reader)
}

pub fn profile(row: UserRow) -> UserProfile {
    UserProfile {
        id: uuid(&row.id, "user id"),
        role: role(&row.role),
        premium_until: row
            .premium_until
            .as_deref()
            .map(|raw| timestamp(raw, "premium_until")),
        created_at: timestamp(&row.created_at, "user created_at"),
        email: row.email,
        name: row.name,
        wallet_coins: row.wallet_coins,
    }
}

pub fn genre(row: GenreRow) -> Genre {
    Genre {
        id: row.id,
        name: row.name,
    }
}

/// Group genre rows by the novel they belong to.
pub fn genres_by_novel(rows: Vec<NovelGenreRow>) -> HashMap<String, Vec<Genre>> {
    let mut map: HashMap<String, Vec<Genre>> = HashMap::new();
    for row in rows {
        map.entry(row.novel_id).or_default().push(Genre {
            id: row.genre_id,
            name: row.name,
        });
    }
    map
}

pub fn novel(row: NovelRow, genres: Vec<Genre>) -> NovelSummary {
    NovelSummary {
        id: uuid(&row.id, "novel id"),
        status: enum_or(&row.status, "novel status", NovelStatus::Ongoing),
        author: UserSummary {
            id: uuid(&row.author_id, "author id"),
            name: row.author_name,
        },
        created_at: timestamp(&row.created_at, "novel created_at"),
        updated_at: timestamp(&row.updated_at, "novel updated_at"),
        title: row.title,
        description: row.description,
        cover_image: row.cover_image,
        is_adult: row.is_adult,
        view_count: row.view_count,
        average_rating: row.average_rating,
        total_ratings: row.total_ratings,
        genres,
        chapters_count: row.published_chapters,
    }
}

/// Convert a page of novels, attaching each one's genres.
pub fn novels(rows: Vec<NovelRow>, genre_rows: Vec<NovelGenreRow>) -> Vec<NovelSummary> {
    let mut genres = genres_by_novel(genre_rows);
    rows.into_iter()
        .map(|row| {
            let g = genres.remove(&row.id).unwrap_or_default();
            novel(row, g)
        })
        .collect()
}

pub fn chapter(row: ChapterRow) -> Chapter {
    Chapter {
        id: uuid(&row.id, "chapter id"),
        novel_id: uuid(&row.novel_id, "chapter novel_id"),
        status: enum_or(&row.status, "chapter status", ChapterStatus::Draft),
        created_at: timestamp(&row.created_at, "chapter created_at"),
        updated_at: timestamp(&row.updated_at, "chapter updated_at"),
        title: row.title,
        content: row.content,
        chapter_number: row.chapter_number,
        is_premium: row.is_premium,
        coins_cost: row.coins_cost,
        word_count: row.word_count,
        view_count: row.view_count,
    }
}

pub fn chapter_listing(row: ChapterListingRow) -> ChapterListing {
    ChapterListing {
        id: uuid(&row.id, "chapter id"),
        created_at: timestamp(&row.created_at, "chapter created_at"),
        updated_at: timestamp(&row.updated_at, "chapter updated_at"),
        title: row.title,
        chapter_number: row.chapter_number,
        view_count: row.view_count,
        is_premium: row.is_premium,
        coins_cost: row.coins_cost,
    }
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: uuid(&row.id, "comment id"),
        chapter_id: uuid(&row.chapter_id, "comment chapter_id"),
        parent_id: row.parent_id.as_deref().map(|p| uuid(p, "comment parent_id")),
        user: UserSummary {
            id: uuid(&row.user_id, "comment user_id"),
            name: row.user_name,
        },
        created_at: timestamp(&row.created_at, "comment created_at"),
        content: row.content,
    }
}

pub fn review(row: ReviewRow) -> Review {
    Review {
        id: uuid(&row.id, "review id"),
        novel_id: uuid(&row.novel_id, "review novel_id"),
        user: UserSummary {
            id: uuid(&row.user_id, "review user_id"),
            name: row.user_name,
        },
        created_at: timestamp(&row.created_at, "review created_at"),
        updated_at: timestamp(&row.updated_at, "review updated_at"),
        rating: row.rating,
        content: row.content,
    }
}

pub fn transaction(row: TransactionRow) -> Transaction {
    Transaction {
        id: uuid(&row.id, "transaction id"),
        transaction_type: enum_or(&row.transaction_type, "transaction type", TransactionType::CoinPurchase),
        created_at: timestamp(&row.created_at, "transaction created_at"),
        amount: row.amount,
        status: row.status,
        item_id: row.item_id,
        item_type: row.item_type,
    }
}
