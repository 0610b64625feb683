use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Genres every fresh database starts with.
const DEFAULT_GENRES: &[&str] = &[
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Horror",
    "Thriller",
    "Adventure",
    "Historical Fiction",
    "Young Adult",
    "Action",
    "Comedy",
    "Drama",
    "Dystopian",
    "Poetry",
    "Slice of Life",
    "Supernatural",
    "Urban Fantasy",
    "Western",
    "Crime",
    "Suspense",
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name            TEXT NOT NULL,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'READER',
                wallet_coins    INTEGER NOT NULL DEFAULT 0 CHECK (wallet_coins >= 0),
                premium_until   TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE genres (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE COLLATE NOCASE
            );

            CREATE TABLE novels (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                cover_image     TEXT,
                status          TEXT NOT NULL,
                is_adult        INTEGER NOT NULL DEFAULT 0,
                view_count      INTEGER NOT NULL DEFAULT 0,
                average_rating  REAL NOT NULL DEFAULT 0,
                total_ratings   INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_novels_author ON novels(author_id);

            CREATE TABLE novel_genres (
                novel_id    TEXT NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                genre_id    INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                PRIMARY KEY (novel_id, genre_id)
            );

            CREATE TABLE chapters (
                id              TEXT PRIMARY KEY,
                novel_id        TEXT NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                chapter_number  INTEGER NOT NULL,
                status          TEXT NOT NULL DEFAULT 'DRAFT',
                is_premium      INTEGER NOT NULL DEFAULT 0,
                coins_cost      INTEGER NOT NULL DEFAULT 0,
                word_count      INTEGER NOT NULL DEFAULT 0,
                view_count      INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (novel_id, chapter_number)
            );

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                chapter_id  TEXT NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                parent_id   TEXT REFERENCES comments(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_chapter ON comments(chapter_id, parent_id, created_at);

            CREATE TABLE reviews (
                id          TEXT PRIMARY KEY,
                novel_id    TEXT NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                content     TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (novel_id, user_id)
            );

            CREATE TABLE bookmarks (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                novel_id    TEXT NOT NULL REFERENCES novels(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, novel_id)
            );

            CREATE TABLE purchases (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                chapter_id  TEXT NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
                amount      INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, chapter_id)
            );

            CREATE TABLE transactions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                amount      INTEGER NOT NULL,
                type        TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'COMPLETED',
                item_id     TEXT,
                item_type   TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_transactions_user ON transactions(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        let mut stmt = conn.prepare("INSERT OR IGNORE INTO genres (name) VALUES (?1)")?;
        for name in DEFAULT_GENRES {
            stmt.execute([name])?;
        }
    }

    info!("Database migrations complete");
    Ok(())
}
