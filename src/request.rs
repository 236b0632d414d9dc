use crate::error::ScrapeError;

/// Tag names a scrape can target
pub const RECOGNIZED_TAGS: [&str; 8] = ["h1", "h2", "h3", "p", "div", "span", "li", "a"];

/// A validated request: where to start and which element type to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    base_url: String,
    tag: String,
}

impl ScrapeRequest {
    /// Validates and builds a request. The URL is trimmed; the tag is matched
    /// case-insensitively against [`RECOGNIZED_TAGS`].
    pub fn new(base_url: &str, tag: &str) -> Result<Self, ScrapeError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ScrapeError::EmptyUrl);
        }

        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(ScrapeError::EmptyTag);
        }
        if !RECOGNIZED_TAGS.contains(&tag.as_str()) {
            return Err(ScrapeError::UnsupportedTag {
                tag,
                expected: RECOGNIZED_TAGS.join(", "),
            });
        }

        Ok(Self {
            base_url: base_url.to_string(),
            tag,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}
