use crate::request::ScrapeRequest;
use std::fmt;

/// Cleaned strings extracted from one page load, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    items: Vec<String>,
}

impl PageResult {
    /// Trims each text and drops the ones left empty, keeping order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = texts
            .into_iter()
            .filter_map(|text| {
                let trimmed = text.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Everything collected by one walk, in page-visit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    items: Vec<String>,
}

impl ScrapeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, page: PageResult) {
        self.items.extend(page.items);
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Why a walk ended. `page` is the 1-based iteration the walk stopped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every allowed page was visited
    PageLimit { pages: usize },
    /// A paged URL produced nothing, which marks the end of the sequence
    NoNewContent { page: usize },
    /// The requested tag never appeared
    ContentTimeout { page: usize, error: String },
    NavigationFailed { page: usize, error: String },
    /// The pagination control could not be clicked
    InteractionFailed { page: usize, error: String },
    ExtractionFailed { page: usize, error: String },
    Cancelled { page: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PageLimit { pages } => write!(f, "page limit of {pages} reached"),
            StopReason::NoNewContent { page } => write!(f, "page {page} had no new content"),
            StopReason::ContentTimeout { page, error } => {
                write!(f, "page {page} never showed content: {error}")
            }
            StopReason::NavigationFailed { page, error } => {
                write!(f, "could not load page {page}: {error}")
            }
            StopReason::InteractionFailed { page, error } => {
                write!(f, "could not advance past page {page}: {error}")
            }
            StopReason::ExtractionFailed { page, error } => {
                write!(f, "could not read page {page}: {error}")
            }
            StopReason::Cancelled { page } => write!(f, "cancelled before page {page}"),
        }
    }
}

/// Result of a finished walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub result: ScrapeResult,
    /// Pages whose content was extracted (or attempted, for URL patterns)
    pub pages_visited: usize,
    pub stop: StopReason,
}

/// Handle-free description of the pagination strategy a run used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Button { hint: String },
    UrlPattern { uses_placeholder: bool },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Button { hint } => write!(f, "button-driven (matched \"{hint}\")"),
            Strategy::UrlPattern {
                uses_placeholder: true,
            } => write!(f, "URL pattern (placeholder substitution)"),
            Strategy::UrlPattern {
                uses_placeholder: false,
            } => write!(f, "URL pattern (/page/N/ suffix)"),
        }
    }
}

/// What a caller gets back from a successful run
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub request: ScrapeRequest,
    pub strategy: Strategy,
    pub result: ScrapeResult,
    pub pages_visited: usize,
    pub stop: StopReason,
}

/// Distinguishes a run that found content from one that found none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeSummary {
    Scraped(usize),
    NoContent,
}

impl ScrapeReport {
    pub fn summary(&self) -> ScrapeSummary {
        if self.result.is_empty() {
            ScrapeSummary::NoContent
        } else {
            ScrapeSummary::Scraped(self.result.len())
        }
    }
}

/// Progress notifications emitted while a run is in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    Started { url: String },
    StrategyDetected(Strategy),
    PageScraped { page: usize, items: usize },
    Stopped(StopReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_result_trims_and_filters() {
        let page = PageResult::from_texts(["  Hello  ", "", "   \n\t", "World"]);
        assert_eq!(page.items(), ["Hello", "World"]);
    }

    #[test]
    fn test_scrape_result_keeps_page_order() {
        let mut result = ScrapeResult::new();
        result.append(PageResult::from_texts(["A1", "A2"]));
        result.append(PageResult::default());
        result.append(PageResult::from_texts(["B1"]));
        assert_eq!(result.items(), ["A1", "A2", "B1"]);
    }

    #[test]
    fn test_summary_distinguishes_empty_runs() {
        let request = ScrapeRequest::new("http://example.test", "p").unwrap();
        let mut report = ScrapeReport {
            request,
            strategy: Strategy::UrlPattern {
                uses_placeholder: false,
            },
            result: ScrapeResult::new(),
            pages_visited: 1,
            stop: StopReason::NoNewContent { page: 1 },
        };
        assert_eq!(report.summary(), ScrapeSummary::NoContent);

        report.result.append(PageResult::from_texts(["x"]));
        assert_eq!(report.summary(), ScrapeSummary::Scraped(1));
    }
}
