pub mod snapshot;
pub mod webdriver;

use crate::error::BrowserError;
use async_trait::async_trait;
use std::time::Duration;

pub use snapshot::{SnapshotBrowser, SnapshotSite};
pub use webdriver::{WebDriverConnector, WebDriverSession};

/// Operations the engine needs from a browser session.
///
/// Implemented by a live WebDriver session ([`webdriver`]) and by an offline
/// replay of saved HTML ([`snapshot`]).
#[async_trait]
pub trait Browser: Send {
    /// Opaque reference to an element on the current page
    type Element: Clone + Send + Sync;

    /// Load a URL
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Return the first element matching `query` that is displayed and enabled,
    /// polling until `timeout` expires.
    async fn find_interactable(
        &mut self,
        query: &ControlQuery,
        timeout: Duration,
    ) -> Result<Self::Element, BrowserError>;

    /// Wait until at least one `tag` element exists on the page
    async fn wait_for_presence(&mut self, tag: &str, timeout: Duration)
    -> Result<(), BrowserError>;

    /// Every `tag` element currently on the page, in document order
    async fn find_all_by_tag(&mut self, tag: &str) -> Result<Vec<Self::Element>, BrowserError>;

    /// Rendered text of an element
    async fn read_text(&mut self, element: &Self::Element) -> Result<String, BrowserError>;

    /// Bring the element into view and click it
    async fn move_and_click(&mut self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Release the session. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Opens browser sessions, one per run.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Browser + 'static;

    async fn connect(&self) -> Result<Self::Session, BrowserError>;
}

/// Matches a pagination control by one hint token.
///
/// An element matches when its `id` or `class` contains the token, or when one
/// of its direct text nodes contains the capitalized token, compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlQuery {
    token: String,
}

impl ControlQuery {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The token with its first letter upper-cased ("more" -> "More")
    pub fn label(&self) -> String {
        let mut chars = self.token.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn matches<'t>(
        &self,
        id: Option<&str>,
        class: Option<&str>,
        text_nodes: impl IntoIterator<Item = &'t str>,
    ) -> bool {
        if self.token.is_empty() {
            return false;
        }
        let label = self.label().to_lowercase();
        id.is_some_and(|id| id.contains(&self.token))
            || class.is_some_and(|class| class.contains(&self.token))
            || text_nodes
                .into_iter()
                .any(|text| text.to_lowercase().contains(&label))
    }

    /// XPath 1.0 expression equivalent to [`ControlQuery::matches`]
    pub fn xpath(&self) -> String {
        let token = xpath_literal(&self.token);
        let label = xpath_literal(&self.label().to_lowercase());
        format!(
            "//*[contains(@id, {token}) or contains(@class, {token}) or \
             text()[contains(translate(., '{UPPER}', '{LOWER}'), {label})]]"
        )
    }
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Quote a string for XPath 1.0, which has no escape sequences
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_capitalizes() {
        assert_eq!(ControlQuery::new("more").label(), "More");
        assert_eq!(ControlQuery::new("load-more").label(), "Load-more");
        assert_eq!(ControlQuery::new("").label(), "");
    }

    #[test]
    fn test_matches_id_class_and_text() {
        let query = ControlQuery::new("next");
        assert!(query.matches(Some("next-page"), None, []));
        assert!(query.matches(None, Some("btn pager-next"), []));
        assert!(query.matches(None, None, ["Next page"]));
        assert!(query.matches(None, None, ["NEXT"]));
        assert!(!query.matches(Some("prev"), Some("pager"), ["Previous"]));
        // id and class comparisons are case-sensitive, like XPath contains()
        assert!(!query.matches(Some("NextPage"), None, []));
    }

    #[test]
    fn test_text_match_checks_each_text_node() {
        let query = ControlQuery::new("more");
        // <button><i></i> <b>x</b>Load more</button>
        assert!(query.matches(None, None, [" ", "Load more"]));
        // a label split across nodes is not a match
        assert!(!query.matches(None, None, ["Load mo", "re"]));
    }

    #[test]
    fn test_empty_token_matches_nothing() {
        assert!(!ControlQuery::new("").matches(Some("x"), Some("y"), ["z"]));
    }

    #[test]
    fn test_xpath() {
        let xpath = ControlQuery::new("more").xpath();
        assert!(xpath.starts_with("//*[contains(@id, 'more') or contains(@class, 'more')"));
        assert!(xpath.ends_with("text()[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'more')]]"));
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("more"), "'more'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal(r#"a'b"c"#), r#"concat('a', "'", 'b"c')"#);
    }
}
