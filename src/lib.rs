// Re-export modules
pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod pagination;
pub mod request;
pub mod results;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use browser::{Browser, Connector};
pub use config::ScraperConfig;
pub use error::{BrowserError, ExportError, ScrapeError};
pub use request::ScrapeRequest;
pub use results::{ScrapeEvent, ScrapeReport, ScrapeResult, ScrapeSummary, StopReason, Strategy};

use browser::WebDriverConnector;
use pagination::{Walker, urls};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot, watch};

/// Runs scrapes against browser sessions opened by a [`Connector`].
///
/// Only one session is open at a time: a run started while another is in
/// flight waits for the earlier session to be closed.
pub struct Scraper<C: Connector> {
    connector: Arc<C>,
    hints: Arc<Vec<String>>,
    session_gate: Arc<Semaphore>,
}

impl Scraper<WebDriverConnector> {
    /// Scraper backed by a WebDriver server, using the config's hints
    pub fn webdriver(config: ScraperConfig) -> Self {
        let hints = config.hints.clone();
        Self::new(WebDriverConnector::new(config)).with_hints(hints)
    }
}

impl<C: Connector + 'static> Scraper<C> {
    /// Create a scraper with the default control hints
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            hints: Arc::new(
                config::DEFAULT_HINTS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            session_gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Replace the pagination control hints (highest priority first)
    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = Arc::new(hints);
        self
    }

    /// Validate the inputs and run a scrape to completion.
    pub async fn scrape(&self, base_url: &str, tag: &str) -> Result<ScrapeReport, ScrapeError> {
        let request = ScrapeRequest::new(base_url, tag)?;
        self.run(request).await
    }

    /// Run a scrape on the current task.
    pub async fn run(&self, request: ScrapeRequest) -> Result<ScrapeReport, ScrapeError> {
        execute(
            &*self.connector,
            &self.hints,
            &self.session_gate,
            request,
            None,
            None,
        )
        .await
    }

    /// Run a scrape on its own task. Progress and the final report come back
    /// through the returned handle.
    pub fn spawn(&self, request: ScrapeRequest) -> ScrapeHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let connector = Arc::clone(&self.connector);
        let hints = Arc::clone(&self.hints);
        let session_gate = Arc::clone(&self.session_gate);

        tokio::spawn(async move {
            let outcome = execute(
                &*connector,
                &hints,
                &session_gate,
                request,
                Some(events_tx),
                Some(cancel_rx),
            )
            .await;
            if done_tx.send(outcome).is_err() {
                ::log::debug!("Scrape finished but nobody was waiting for the report");
            }
        });

        ScrapeHandle {
            events: events_rx,
            done: done_rx,
            cancel: cancel_tx,
        }
    }
}

/// A scrape running on its own task
pub struct ScrapeHandle {
    events: mpsc::UnboundedReceiver<ScrapeEvent>,
    done: oneshot::Receiver<Result<ScrapeReport, ScrapeError>>,
    cancel: watch::Sender<bool>,
}

impl ScrapeHandle {
    /// Next progress event; `None` once the run is over and all events are read
    pub async fn next_event(&mut self) -> Option<ScrapeEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop before its next page
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the run to end
    pub async fn finish(self) -> Result<ScrapeReport, ScrapeError> {
        self.done.await.unwrap_or(Err(ScrapeError::Aborted))
    }
}

/// Opens a session, scrapes, and closes the session on every path.
async fn execute<C: Connector>(
    connector: &C,
    hints: &[String],
    session_gate: &Semaphore,
    request: ScrapeRequest,
    events: Option<mpsc::UnboundedSender<ScrapeEvent>>,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<ScrapeReport, ScrapeError> {
    let _permit = session_gate
        .acquire()
        .await
        .map_err(|_| ScrapeError::Aborted)?;

    ::log::info!(
        "Starting scrape of <{}> elements at {}",
        request.tag(),
        request.base_url()
    );
    emit(
        &events,
        ScrapeEvent::Started {
            url: request.base_url().to_string(),
        },
    );

    let mut session = connector.connect().await.map_err(|e| {
        ::log::error!("Failed to start browser session: {}", e);
        ScrapeError::SessionSetup(e.to_string())
    })?;

    let outcome = scrape_session(&mut session, hints, request, events, cancel).await;

    if let Err(e) = session.close().await {
        ::log::warn!("Failed to close browser session: {}", e);
    }
    outcome
}

async fn scrape_session<B: Browser>(
    session: &mut B,
    hints: &[String],
    request: ScrapeRequest,
    events: Option<mpsc::UnboundedSender<ScrapeEvent>>,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<ScrapeReport, ScrapeError> {
    // A templated URL is not a page of its own; start from page 1
    let start_url = if urls::uses_placeholder(request.base_url()) {
        urls::page_url(request.base_url(), true, 1)
    } else {
        request.base_url().to_string()
    };

    session
        .navigate(&start_url)
        .await
        .map_err(|source| ScrapeError::InitialLoad {
            url: start_url.clone(),
            source,
        })?;

    let plan = pagination::detect(session, request.base_url(), hints).await;
    let strategy = plan.strategy();
    emit(&events, ScrapeEvent::StrategyDetected(strategy.clone()));

    let mut walker = Walker::new(session, &request);
    if let Some(events) = events {
        walker = walker.with_events(events);
    }
    if let Some(cancel) = cancel {
        walker = walker.with_cancel(cancel);
    }
    let outcome = walker.walk(&plan).await;

    match outcome.result.len() {
        0 => ::log::warn!("No <{}> content found at {}", request.tag(), request.base_url()),
        n => ::log::info!("Scraped {} items from {}", n, request.base_url()),
    }

    Ok(ScrapeReport {
        request,
        strategy,
        result: outcome.result,
        pages_visited: outcome.pages_visited,
        stop: outcome.stop,
    })
}

fn emit(events: &Option<mpsc::UnboundedSender<ScrapeEvent>>, event: ScrapeEvent) {
    if let Some(events) = events {
        let _ = events.send(event);
    }
}
