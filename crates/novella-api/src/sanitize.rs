//! Chapter content cleanup.

use std::collections::HashSet;

use ammonia::Builder;
use lazy_regex::regex;

/// Clean chapter HTML down to a safe subset of markup.
///
/// Script and style elements are dropped with their contents, `on*`
/// attributes never survive, and links keep only http, https and mailto
/// URLs. Text is kept as is.
pub fn sanitize_content(content: &str) -> String {
    let mut builder = Builder::default();
    builder
        .rm_tags(["script", "style"])
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(None);
    builder.clean(content).to_string()
}

/// Whitespace-separated words of `content`, ignoring markup.
pub fn word_count(content: &str) -> i64 {
    let text = regex!(r"<[^>]*>").replace_all(content, " ");
    text.split_whitespace().count() as i64
}
