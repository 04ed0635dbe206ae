// URL normalization for wiki page keys

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

/// Short, unique identifier for a page: the last path segment with fragment
/// and query removed and underscores turned into spaces.
pub fn url_key(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace('_', " ")
}

/// Extends site-relative wiki links (`/wiki/...`) with `base_url`.
///
/// Protocol-relative links get an `https:` scheme; anything else is returned
/// unchanged.
pub fn complete_url(base_url: &str, url: &str) -> String {
    if url.starts_with("//") {
        return format!("https:{}", url);
    }

    let trimmed = url.trim_matches('/');
    let mut sections = trimmed.split('/');
    if sections.next() == Some("wiki") {
        return format!("{}/{}", base_url.trim_end_matches('/'), trimmed);
    }
    url.to_string()
}
