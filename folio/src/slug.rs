use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("slug regex"));

/// Derive a URL-safe slug from explicit metadata or a fallback source name.
///
/// Lower-cases, collapses every run of other characters to a single `-`,
/// and trims dashes. Returns `None` when nothing survives.
pub fn sanitize(raw: Option<&str>, fallback: &str) -> Option<String> {
    let candidate = raw.unwrap_or(fallback).trim().to_lowercase();
    let slug = NON_SLUG_RE
        .replace_all(&candidate, "-")
        .trim_matches('-')
        .to_string();
    if slug.is_empty() { None } else { Some(slug) }
}
