use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN: invalid pattern"));

/// Comparison key: trimmed, lower-case, without diacritics.
/// Text is decomposed (NFD) and combining marks are dropped, so precomposed
/// and decomposed input fold to the same key ("Crítica", "Cri\u{301}tica" → "critica").
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// "línea 1\n\n  línea 2" → "línea 1 línea 2"
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Compares two identities (emails) ignoring case and surrounding blanks.
pub fn same_identity(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
