//! Premium chapter gating.

use chrono::{DateTime, Utc};

/// Characters of a premium chapter shown to readers without access.
pub const PREVIEW_CHARS: usize = 1000;

/// What is known about the reader asking for a chapter.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    pub user_id: &'a str,
    pub premium_until: Option<DateTime<Utc>>,
    pub has_purchase: bool,
}

/// Whether `reader` may see the full body of a premium chapter written by
/// `author_id`. Anonymous readers never can.
pub fn can_read_premium(reader: Option<&Reader<'_>>, author_id: &str, now: DateTime<Utc>) -> bool {
    let Some(reader) = reader else {
        return false;
    };

    reader.premium_until.is_some_and(|until| until > now)
        || reader.has_purchase
        || reader.user_id == author_id
}

/// The first [`PREVIEW_CHARS`] characters of `content`, followed by `...`.
pub fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}
