use super::PaginationPlan;
use super::urls;
use crate::browser::Browser;
use crate::config::{ELEMENT_WAIT, MAX_PAGES, SETTLE_DELAY};
use crate::error::BrowserError;
use crate::extractor;
use crate::request::ScrapeRequest;
use crate::results::{PageResult, ScrapeEvent, ScrapeResult, StopReason, WalkOutcome};
use tokio::sync::{mpsc, watch};

/// Drives the page-advance loop for one run and owns its result until the
/// walk ends. Per-page failures end the walk; they are never returned as errors.
pub struct Walker<'a, B: Browser> {
    browser: &'a mut B,
    request: &'a ScrapeRequest,
    max_pages: usize,
    events: Option<mpsc::UnboundedSender<ScrapeEvent>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, B: Browser> Walker<'a, B> {
    pub fn new(browser: &'a mut B, request: &'a ScrapeRequest) -> Self {
        Self {
            browser,
            request,
            max_pages: MAX_PAGES,
            events: None,
            cancel: None,
        }
    }

    /// Report progress on this channel
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScrapeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop before the next page once this flag turns true
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn walk(mut self, plan: &PaginationPlan<B::Element>) -> WalkOutcome {
        ::log::info!(
            "Walking up to {} pages of {} using {}",
            self.max_pages,
            self.request.base_url(),
            plan.strategy()
        );

        let outcome = match plan {
            PaginationPlan::ButtonDriven { control, .. } => self.walk_button(control).await,
            PaginationPlan::UrlPattern { uses_placeholder } => {
                self.walk_url_pattern(*uses_placeholder).await
            }
        };

        ::log::info!(
            "Walk finished after {} pages with {} items: {}",
            outcome.pages_visited,
            outcome.result.len(),
            outcome.stop
        );
        self.emit(ScrapeEvent::Stopped(outcome.stop.clone()));
        outcome
    }

    /// Extract, click, settle. An empty page does not end this mode; only a
    /// failed wait or click does.
    async fn walk_button(&mut self, control: &B::Element) -> WalkOutcome {
        let request = self.request;
        let tag = request.tag();
        let mut result = ScrapeResult::new();

        for page in 1..=self.max_pages {
            if self.is_cancelled() {
                return finish(result, page - 1, StopReason::Cancelled { page });
            }

            if let Err(e) = self.browser.wait_for_presence(tag, ELEMENT_WAIT).await {
                return finish(result, page - 1, wait_stop(page, e));
            }

            let extracted = match extractor::extract(self.browser, tag).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    let stop = StopReason::ExtractionFailed {
                        page,
                        error: e.to_string(),
                    };
                    return finish(result, page - 1, stop);
                }
            };
            self.record(page, extracted, &mut result);

            if let Err(e) = self.browser.move_and_click(control).await {
                ::log::debug!("Click on pagination control failed after page {}: {}", page, e);
                let stop = StopReason::InteractionFailed {
                    page,
                    error: e.to_string(),
                };
                return finish(result, page, stop);
            }
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        let pages = self.max_pages;
        finish(result, pages, StopReason::PageLimit { pages })
    }

    /// Navigate, wait, extract. An empty page marks the end of the sequence.
    async fn walk_url_pattern(&mut self, uses_placeholder: bool) -> WalkOutcome {
        let request = self.request;
        let tag = request.tag();
        let mut result = ScrapeResult::new();

        for page in 1..=self.max_pages {
            if self.is_cancelled() {
                return finish(result, page - 1, StopReason::Cancelled { page });
            }

            let url = urls::page_url(request.base_url(), uses_placeholder, page);
            ::log::debug!("Loading page {}: {}", page, url);

            if let Err(e) = self.browser.navigate(&url).await {
                let stop = StopReason::NavigationFailed {
                    page,
                    error: e.to_string(),
                };
                return finish(result, page - 1, stop);
            }

            if let Err(e) = self.browser.wait_for_presence(tag, ELEMENT_WAIT).await {
                return finish(result, page - 1, wait_stop(page, e));
            }

            let extracted = match extractor::extract(self.browser, tag).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    let stop = StopReason::ExtractionFailed {
                        page,
                        error: e.to_string(),
                    };
                    return finish(result, page - 1, stop);
                }
            };

            if extracted.is_empty() {
                return finish(result, page, StopReason::NoNewContent { page });
            }
            self.record(page, extracted, &mut result);
        }

        let pages = self.max_pages;
        finish(result, pages, StopReason::PageLimit { pages })
    }

    fn record(&self, page: usize, extracted: PageResult, result: &mut ScrapeResult) {
        ::log::info!("Page {}: {} items", page, extracted.len());
        self.emit(ScrapeEvent::PageScraped {
            page,
            items: extracted.len(),
        });
        result.append(extracted);
    }

    fn emit(&self, event: ScrapeEvent) {
        if let Some(events) = &self.events {
            // A caller that stopped listening does not stop the walk
            let _ = events.send(event);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| *cancel.borrow())
    }
}

fn finish(result: ScrapeResult, pages_visited: usize, stop: StopReason) -> WalkOutcome {
    WalkOutcome {
        result,
        pages_visited,
        stop,
    }
}

/// A wait that expired means the content never arrived; anything else means
/// the page could not be read at all.
fn wait_stop(page: usize, error: BrowserError) -> StopReason {
    match error {
        BrowserError::Timeout { .. } => StopReason::ContentTimeout {
            page,
            error: error.to_string(),
        },
        other => StopReason::ExtractionFailed {
            page,
            error: other.to_string(),
        },
    }
}
