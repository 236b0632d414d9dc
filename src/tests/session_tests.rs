use crate::browser::SnapshotSite;
use crate::error::{BrowserError, ScrapeError};
use crate::{ScrapeRequest, Scraper};
use std::time::Duration;

fn site() -> SnapshotSite {
    SnapshotSite::new()
        .page("http://example.test/list", "<h2>A</h2>")
        .page("http://example.test/list/page/1/", "<h2>A</h2>")
}

#[tokio::test]
async fn test_validation_errors_never_open_a_session() {
    let site = site();
    let scraper = Scraper::new(site.clone());

    let err = scraper.scrape("", "h2").await.unwrap_err();
    assert!(matches!(err, ScrapeError::EmptyUrl));

    let err = scraper.scrape("http://example.test/list", " ").await.unwrap_err();
    assert!(matches!(err, ScrapeError::EmptyTag));

    let err = scraper.scrape("http://example.test/list", "blink").await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(site.sessions_opened(), 0);
    assert!(site.navigations().is_empty());
}

#[tokio::test]
async fn test_session_setup_failure_is_fatal() {
    let site = site().refuse_connections();
    let scraper = Scraper::new(site.clone());

    let err = scraper.scrape("http://example.test/list", "h2").await.unwrap_err();
    assert!(matches!(err, ScrapeError::SessionSetup(_)));
    assert_eq!(
        err.to_string(),
        "failed to start browser session: browser protocol error: snapshot site refused the connection"
    );
    assert_eq!(site.sessions_opened(), 0);
}

#[tokio::test]
async fn test_unreachable_start_page_fails_and_releases_session() {
    let site = site();
    let scraper = Scraper::new(site.clone());

    let err = scraper.scrape("http://example.test/elsewhere", "h2").await.unwrap_err();
    match err {
        ScrapeError::InitialLoad { url, source } => {
            assert_eq!(url, "http://example.test/elsewhere");
            assert!(matches!(source, BrowserError::Navigation { .. }));
        }
        other => panic!("expected an initial load failure, got {other:?}"),
    }
    assert_eq!(site.sessions_opened(), 1);
    assert_eq!(site.sessions_closed(), 1);
}

#[tokio::test]
async fn test_session_released_after_early_stop() {
    let site = site();
    let report = Scraper::new(site.clone())
        .scrape("http://example.test/list", "h2")
        .await
        .unwrap();

    // page 2 is missing, so the walk ends early
    assert_eq!(report.result.items(), ["A"]);
    assert_eq!(site.sessions_closed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_runs_never_share_or_overlap_sessions() {
    let site = site();
    let scraper = Scraper::new(site.clone());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let request = ScrapeRequest::new("http://example.test/list", "h2").unwrap();
            scraper.spawn(request)
        })
        .collect();

    for handle in handles {
        let report = handle.finish().await.unwrap();
        assert_eq!(report.result.items(), ["A"]);
    }

    assert_eq!(site.sessions_opened(), 4);
    assert_eq!(site.sessions_closed(), 4);
    assert_eq!(site.peak_open_sessions(), 1);
}

#[tokio::test]
async fn test_dropped_handle_does_not_leak_the_session() {
    let site = site();
    let scraper = Scraper::new(site.clone());
    let request = ScrapeRequest::new("http://example.test/list", "h2").unwrap();

    // nobody listens for the report, but the run still finishes and cleans up
    drop(scraper.spawn(request));
    tokio::time::timeout(Duration::from_secs(5), async {
        while site.sessions_closed() < 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let report = scraper.scrape("http://example.test/list", "h2").await.unwrap();
    assert_eq!(report.result.len(), 1);
    assert_eq!(site.sessions_opened(), 2);
    assert_eq!(site.sessions_closed(), 2);
}
