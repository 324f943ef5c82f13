use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9 -]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHENS: Regex = Regex::new(r"-+").unwrap();
}

const FALLBACK_SLUG: &str = "untitled";

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Derive a URL-safe slug from a title: `"Hello, World!"` -> `"hello-world"`.
pub fn generate_slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lower, "");
    let hyphenated = WHITESPACE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    let slug = collapsed.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// First of `base`, `base-1`, `base-2`, ... not present in `taken`.
pub fn unique_slug<S: AsRef<str>>(base: &str, taken: &[S]) -> String {
    let taken: HashSet<&str> = taken.iter().map(|s| s.as_ref()).collect();
    if !taken.contains(base) {
        return base.to_string();
    }

    (1u32..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
