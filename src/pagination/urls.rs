use crate::config::PAGE_PLACEHOLDER;

/// Whether page URLs are built by substituting the `{page}` token
pub fn uses_placeholder(base_url: &str) -> bool {
    base_url.contains(PAGE_PLACEHOLDER)
}

/// Builds the URL of a 1-based page.
///
/// With a placeholder every `{page}` is replaced by the page number; otherwise
/// `/page/N/` is appended to the base with its trailing slashes removed.
pub fn page_url(base_url: &str, uses_placeholder: bool, page: usize) -> String {
    if uses_placeholder {
        base_url.replace(PAGE_PLACEHOLDER, &page.to_string())
    } else {
        format!("{}/page/{}/", base_url.trim_end_matches('/'), page)
    }
}
