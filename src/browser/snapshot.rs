use super::{Browser, Connector, ControlQuery};
use crate::error::BrowserError;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden")
        .expect("hidden-style pattern should be valid")
});

/// On-disk form of a site: `{"pages": {"<url>": ["<html>", ...]}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteFile {
    pub pages: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct SiteState {
    pages: HashMap<String, Vec<String>>,
    refuse_connections: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    peak_open: AtomicUsize,
    clicks: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

/// A replayable site. Cloning shares the same pages and counters.
///
/// Each URL maps to an ordered list of HTML states. Navigating loads the
/// first state; clicking a control on that page advances to the next one.
/// Pages are static, so waits and lookups resolve immediately.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSite {
    state: Arc<SiteState>,
}

impl SnapshotSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a site from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load a site from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let file: SiteFile = serde_json::from_str(json)?;
        Ok(Self::from_pages(file.pages))
    }

    pub fn from_pages(pages: HashMap<String, Vec<String>>) -> Self {
        Self {
            state: Arc::new(SiteState {
                pages,
                ..SiteState::default()
            }),
        }
    }

    /// Add a page with a single state. Clones taken earlier do not see it.
    pub fn page(self, url: &str, html: &str) -> Self {
        self.page_states(url, [html])
    }

    /// Add a page whose content changes each time a control is clicked
    pub fn page_states<I, S>(self, url: &str, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pages = self.take_pages();
        pages.insert(
            url.to_string(),
            states.into_iter().map(Into::into).collect(),
        );
        Self::from_pages(pages)
    }

    /// Make every later `connect` fail, as if no driver were running
    pub fn refuse_connections(self) -> Self {
        self.state.refuse_connections.store(true, Ordering::SeqCst);
        self
    }

    fn take_pages(self) -> HashMap<String, Vec<String>> {
        match Arc::try_unwrap(self.state) {
            Ok(state) => state.pages,
            Err(shared) => shared.pages.clone(),
        }
    }

    /// Open a browser on this site
    pub fn browser(&self) -> SnapshotBrowser {
        let opened = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let open_now = opened.saturating_sub(self.state.closed.load(Ordering::SeqCst));
        self.state.peak_open.fetch_max(open_now, Ordering::SeqCst);
        SnapshotBrowser {
            site: self.clone(),
            current: None,
            closed: false,
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Most sessions that were open at the same time
    pub fn peak_open_sessions(&self) -> usize {
        self.state.peak_open.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> usize {
        self.state.clicks.load(Ordering::SeqCst)
    }

    /// Every URL navigated to, in order
    pub fn navigations(&self) -> Vec<String> {
        self.state
            .navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn html(&self, url: &str, state: usize) -> Option<&str> {
        self.state
            .pages
            .get(url)
            .and_then(|states| states.get(state))
            .map(String::as_str)
    }

    fn state_count(&self, url: &str) -> usize {
        self.state.pages.get(url).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Connector for SnapshotSite {
    type Session = SnapshotBrowser;

    async fn connect(&self) -> Result<SnapshotBrowser, BrowserError> {
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err(BrowserError::Protocol(
                "snapshot site refused the connection".to_string(),
            ));
        }
        Ok(self.browser())
    }
}

/// Handle to an element of a snapshot page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotElement {
    url: String,
    ordinal: usize,
    text: String,
}

impl SnapshotElement {
    /// Position among all elements of the page, in document order
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Browser session over a [`SnapshotSite`]
#[derive(Debug)]
pub struct SnapshotBrowser {
    site: SnapshotSite,
    current: Option<(String, usize)>,
    closed: bool,
}

impl SnapshotBrowser {
    fn current_html(&self) -> Result<(&str, &str), BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        let (url, state) = self
            .current
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("no page loaded".to_string()))?;
        let html = self
            .site
            .html(url, *state)
            .ok_or_else(|| BrowserError::Protocol(format!("missing state {state} for {url}")))?;
        Ok((url.as_str(), html))
    }
}

/// Element and its ancestors are all visible
fn is_displayed(element: &ElementRef) -> bool {
    let hidden = |el: &ElementRef| {
        el.value().attr("hidden").is_some()
            || el
                .value()
                .attr("style")
                .is_some_and(|style| HIDDEN_STYLE.is_match(style))
    };
    !hidden(element)
        && !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| hidden(&ancestor))
}

fn is_enabled(element: &ElementRef) -> bool {
    element.value().attr("disabled").is_none()
        && element.value().attr("aria-disabled") != Some("true")
}

/// Direct text nodes of an element, each kept separate
fn own_text_nodes<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|text| &**text))
}

/// Rendered text: hidden elements render nothing
fn rendered_text(element: &ElementRef) -> String {
    if is_displayed(element) {
        element.text().collect()
    } else {
        String::new()
    }
}

fn all_elements(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

fn find_control(url: &str, html: &str, query: &ControlQuery) -> Option<SnapshotElement> {
    let doc = Html::parse_document(html);
    all_elements(&doc)
        .enumerate()
        .find(|(_, el)| {
            query.matches(
                el.value().attr("id"),
                el.value().attr("class"),
                own_text_nodes(el),
            ) && is_displayed(el)
                && is_enabled(el)
        })
        .map(|(ordinal, el)| SnapshotElement {
            url: url.to_string(),
            ordinal,
            text: rendered_text(&el),
        })
}

fn find_by_tag(url: &str, html: &str, tag: &str) -> Result<Vec<SnapshotElement>, BrowserError> {
    let doc = Html::parse_document(html);
    // validates the tag name the same way a CSS locator would
    Selector::parse(tag)
        .map_err(|_| BrowserError::Protocol(format!("invalid tag selector `{tag}`")))?;

    Ok(all_elements(&doc)
        .enumerate()
        .filter(|(_, el)| el.value().name().eq_ignore_ascii_case(tag))
        .map(|(ordinal, el)| SnapshotElement {
            url: url.to_string(),
            ordinal,
            text: rendered_text(&el),
        })
        .collect())
}

#[async_trait]
impl Browser for SnapshotBrowser {
    type Element = SnapshotElement;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        self.site
            .state
            .navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        if self.site.state_count(url) == 0 {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "page not in snapshot".to_string(),
            });
        }
        self.current = Some((url.to_string(), 0));
        Ok(())
    }

    async fn find_interactable(
        &mut self,
        query: &ControlQuery,
        _timeout: Duration,
    ) -> Result<SnapshotElement, BrowserError> {
        let (url, html) = self.current_html()?;
        find_control(url, html, query).ok_or_else(|| BrowserError::NotFound {
            what: format!("hint \"{}\"", query.token()),
        })
    }

    async fn wait_for_presence(&mut self, tag: &str, timeout: Duration) -> Result<(), BrowserError> {
        let (url, html) = self.current_html()?;
        if find_by_tag(url, html, tag)?.is_empty() {
            return Err(BrowserError::Timeout {
                what: format!("<{tag}>"),
                after: timeout,
            });
        }
        Ok(())
    }

    async fn find_all_by_tag(&mut self, tag: &str) -> Result<Vec<SnapshotElement>, BrowserError> {
        let (url, html) = self.current_html()?;
        find_by_tag(url, html, tag)
    }

    async fn read_text(&mut self, element: &SnapshotElement) -> Result<String, BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        Ok(element.text.clone())
    }

    async fn move_and_click(&mut self, element: &SnapshotElement) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        let Some((url, state)) = self.current.as_mut() else {
            return Err(BrowserError::Interaction("no page loaded".to_string()));
        };
        if *url != element.url {
            return Err(BrowserError::Interaction(
                "stale element reference".to_string(),
            ));
        }
        if *state + 1 >= self.site.state_count(url) {
            return Err(BrowserError::Interaction(
                "control no longer responds".to_string(),
            ));
        }

        *state += 1;
        self.site.state.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.site.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(10);

    fn site() -> SnapshotSite {
        SnapshotSite::new()
            .page(
                "http://x/list",
                r#"<html><body>
                    <h2>  First  </h2>
                    <div style="display: none"><h2>Hidden</h2></div>
                    <h2></h2>
                    <button id="load-more" disabled>More</button>
                    <a class="pager next" href="/2">Next</a>
                </body></html>"#,
            )
            .page_states("http://x/feed", ["<p>one</p><button>More</button>", "<p>one</p><p>two</p>"])
    }

    #[tokio::test]
    async fn test_navigate_unknown_url_fails() {
        let site = site();
        let mut browser = site.browser();
        let err = browser.navigate("http://x/missing").await.unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
        assert_eq!(site.navigations(), vec!["http://x/missing"]);
    }

    #[tokio::test]
    async fn test_hidden_elements_render_empty_text() {
        let mut browser = site().browser();
        browser.navigate("http://x/list").await.unwrap();

        let elements = browser.find_all_by_tag("h2").await.unwrap();
        let mut texts = Vec::new();
        for el in &elements {
            texts.push(browser.read_text(el).await.unwrap());
        }
        assert_eq!(texts, vec!["  First  ", "", ""]);
    }

    #[tokio::test]
    async fn test_disabled_controls_are_skipped() {
        let mut browser = site().browser();
        browser.navigate("http://x/list").await.unwrap();

        // the only "more" match is disabled
        let err = browser
            .find_interactable(&ControlQuery::new("more"), WAIT)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::NotFound { .. }));

        let next = browser
            .find_interactable(&ControlQuery::new("next"), WAIT)
            .await
            .unwrap();
        assert_eq!(next.text, "Next");
    }

    #[tokio::test]
    async fn test_control_label_after_inline_markup_matches() {
        let site = SnapshotSite::new().page(
            "http://x/",
            "<a>Load mo<b></b>re</a><button><i></i> <b>x</b>Load more</button>",
        );
        let mut browser = site.browser();
        browser.navigate("http://x/").await.unwrap();

        let control = browser
            .find_interactable(&ControlQuery::new("more"), WAIT)
            .await
            .unwrap();
        // the split label in <a> is skipped
        assert_eq!(control.text, " xLoad more");
        assert_eq!(control.ordinal(), 5);
    }

    #[tokio::test]
    async fn test_click_advances_states_until_exhausted() {
        let site = site();
        let mut browser = site.browser();
        browser.navigate("http://x/feed").await.unwrap();

        let control = browser
            .find_interactable(&ControlQuery::new("more"), WAIT)
            .await
            .unwrap();
        browser.move_and_click(&control).await.unwrap();
        assert_eq!(browser.find_all_by_tag("p").await.unwrap().len(), 2);

        let err = browser.move_and_click(&control).await.unwrap_err();
        assert!(matches!(err, BrowserError::Interaction(_)));
        assert_eq!(site.clicks(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_missing_tag_times_out() {
        let mut browser = site().browser();
        browser.navigate("http://x/feed").await.unwrap();
        let err = browser.wait_for_presence("li", WAIT).await.unwrap_err();
        assert_eq!(
            err,
            BrowserError::Timeout {
                what: "<li>".to_string(),
                after: WAIT
            }
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let site = site();
        let mut browser = site.browser();
        browser.close().await.unwrap();
        browser.close().await.unwrap();
        assert_eq!(site.sessions_closed(), 1);
        assert_eq!(
            browser.navigate("http://x/list").await.unwrap_err(),
            BrowserError::SessionClosed
        );
    }

    #[test]
    fn test_from_json() {
        let site = SnapshotSite::from_json(r#"{"pages": {"http://x/": ["<p>a</p>", "<p>b</p>"]}}"#)
            .unwrap();
        assert_eq!(site.state_count("http://x/"), 2);
        assert!(SnapshotSite::from_json("[]").is_err());
    }
}
