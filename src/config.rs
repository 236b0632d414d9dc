use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Maximum number of page advances in a single walk
pub const MAX_PAGES: usize = 7;

/// Upper bound for every element lookup and presence wait
pub const ELEMENT_WAIT: Duration = Duration::from_secs(10);

/// Pause after clicking a "load more" control so the page can update in place
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Token replaced by the page number when building paged URLs
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Control hints tried in priority order when looking for a pagination control
pub const DEFAULT_HINTS: [&str; 5] = ["more", "next", "load", "show", "load-more"];

/// Which browser the WebDriver server should launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

/// Configuration for a scraper instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Servers tried in order when `webdriver_url` refuses the connection
    #[serde(default = "default_fallback_webdriver_urls")]
    pub fallback_webdriver_urls: Vec<String>,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub browser: BrowserKind,

    /// Pagination control hints, highest priority first
    #[serde(default = "default_hints")]
    pub hints: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            fallback_webdriver_urls: default_fallback_webdriver_urls(),
            headless: default_headless(),
            browser: BrowserKind::default(),
            hints: default_hints(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply the `WEBDRIVER_URL` environment override, if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Common local driver ports
fn default_fallback_webdriver_urls() -> Vec<String> {
    [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4723", // Appium default
        "http://localhost:9222", // Chrome debug port default
        "http://127.0.0.1:4444",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_headless() -> bool {
    true
}

fn default_hints() -> Vec<String> {
    DEFAULT_HINTS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ScraperConfig::from_json("{}").unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(config.headless);
        assert_eq!(config.browser, BrowserKind::Chrome);
        assert_eq!(config.hints, vec!["more", "next", "load", "show", "load-more"]);
        assert_eq!(config.fallback_webdriver_urls.len(), 4);
    }

    #[test]
    fn test_partial_override() {
        let config = ScraperConfig::from_json(
            r#"{"webdriver_url": "http://grid:4444", "browser": "firefox", "headless": false}"#,
        )
        .unwrap();
        assert_eq!(config.webdriver_url, "http://grid:4444");
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert!(!config.headless);
        assert_eq!(config.hints.len(), DEFAULT_HINTS.len());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hints": ["next", "more"]}}"#).unwrap();

        let config = ScraperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.hints, vec!["next", "more"]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(ScraperConfig::from_json("{ not json").is_err());
        assert!(ScraperConfig::from_file("/definitely/not/here.json").is_err());
    }
}
