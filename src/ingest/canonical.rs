use crate::constants::RECOGNIZED_DOMAINS;

/// Drops query and fragment, enforces a scheme and trims trailing separators.
///
/// Idempotent: applying it to its own output changes nothing.
pub fn canonicalize(link: &str) -> String {
    let mut canonical = link.trim();
    if let Some((head, _)) = canonical.split_once('?') {
        canonical = head;
    }
    if let Some((head, _)) = canonical.split_once('#') {
        canonical = head;
    }
    let with_scheme = ensure_scheme(canonical);
    with_scheme
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

pub fn ensure_scheme(link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}

/// Substring check against the accepted domain family. Runs before any network access.
pub fn is_recognized(link: &str) -> bool {
    RECOGNIZED_DOMAINS.iter().any(|domain| link.contains(domain))
}
