use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::canonical::is_recognized;

/// Link shapes tried against free text, most specific first.
static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "desktop",
            Regex::new(r"https?://(?:www\.)?tiktok\.com/@[^/\s]*/video/[0-9]+\S*").unwrap(),
        ),
        (
            "short-code",
            Regex::new(r"https?://(?:www\.)?tiktok\.com/t/[A-Za-z0-9]+\S*").unwrap(),
        ),
        (
            "vm-short",
            Regex::new(r"https?://vm\.tiktok\.com/[A-Za-z0-9]+\S*").unwrap(),
        ),
        (
            "vt-short",
            Regex::new(r"https?://vt\.tiktok\.com/[A-Za-z0-9]+\S*").unwrap(),
        ),
        (
            "mobile",
            Regex::new(r"https?://m\.tiktok\.com/v/[0-9]+\.html\S*").unwrap(),
        ),
        (
            "generic",
            Regex::new(r"https?://[^/\s]*tiktok\.com/\S*").unwrap(),
        ),
    ]
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';'];

/// Pulls the first recognizable video link out of `text`.
///
/// Falls back to the trimmed input when nothing matches; validation downstream decides whether
/// that input is usable.
pub fn extract_link(text: &str) -> String {
    for (name, pattern) in PATTERNS.iter() {
        if let Some(found) = pattern.find(text) {
            let link = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            debug!(target: "tiklink::ingest::extract", pattern = name, link, "extracted link");
            return link.to_string();
        }
    }

    let trimmed = text.trim();
    if is_recognized(trimmed) {
        debug!(target: "tiklink::ingest::extract", "input is already a bare link");
    }
    trimmed.to_string()
}
