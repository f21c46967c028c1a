use regex::Regex;
use std::sync::OnceLock;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Strips markup tags, collapses whitespace runs and trims.
///
/// Tags are replaced by a space rather than removed so that
/// `"one<br>two"` becomes `"one two"`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    // `[^>]*` also spans newlines, so no tag can survive the first pass.
    let without_tags = get_regex(&TAG, r"<[^>]*>").replace_all(text, " ");
    let collapsed = get_regex(&WHITESPACE, r"\s+").replace_all(&without_tags, " ");
    collapsed.trim().to_string()
}

/// Absent values stay absent.
#[must_use]
pub fn normalize(text: Option<&str>) -> Option<String> {
    text.map(normalize_text)
}
