/// Convert a URL to a sanitized file stem
pub fn sanitize_filename(url: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = url.replace("http://", "").replace("https://", "");
    name = name.replace(['/', ':', '?', '&', '=', '#', '%', '{', '}'], "_");
    let name = name.trim_matches('_');

    // Limit filename length
    let name: String = name.chars().take(100).collect();
    if name.is_empty() {
        "scrape".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("http://example.test/list/"), "example.test_list");
        assert_eq!(sanitize_filename("https://x/p{page}?a=1"), "x_p_page__a_1");
        assert_eq!(sanitize_filename("https://"), "scrape");
        assert_eq!(sanitize_filename(&format!("http://{}", "a".repeat(300))).len(), 100);
    }
}
