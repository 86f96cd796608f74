use regex::Regex;
use std::sync::OnceLock;

/// Scheme, then one or more allowed characters. Anchored at the start only:
/// anything after the first disallowed character is ignored.
const URL_PATTERN: &str = r"^https?://(?:[a-zA-Z0-9]|[$-_@.&+]|[!*\\(),]|%[0-9a-fA-F]{2})+";

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(URL_PATTERN).expect("URL pattern is valid"))
}

/// Whether `text` starts with something that looks like an http(s) URL
pub fn is_url(text: &str) -> bool {
    url_regex().is_match(text)
}
