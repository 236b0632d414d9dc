use clap::Parser;
use smart_scrape::browser::SnapshotSite;
use smart_scrape::export::{self, ExportFormat};
use smart_scrape::{
    Connector, ScrapeError, ScrapeEvent, ScrapeReport, ScrapeRequest, ScrapeSummary, Scraper,
    ScraperConfig, utils,
};
use std::path::PathBuf;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let request = match ScrapeRequest::new(&args.url, args.tag.as_str()) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match &args.replay {
        Some(path) => match SnapshotSite::from_file(path) {
            Ok(site) => {
                ::log::info!("Replaying saved site from {}", path.display());
                run(Scraper::new(site).with_hints(config.hints.clone()), request).await
            }
            Err(e) => {
                eprintln!("Error: failed to load replay file {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => {
            println!("Note: scraping requires a WebDriver server (e.g., ChromeDriver).");
            println!("Using WebDriver at {}", config.webdriver_url);
            run(Scraper::webdriver(config), request).await
        }
    };

    match outcome {
        Ok(report) => present(&report, &args),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<ScraperConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ScraperConfig::from_file(path)?,
        None => ScraperConfig::default(),
    }
    .with_env_overrides();

    if let Some(webdriver_url) = &args.webdriver {
        config.webdriver_url = webdriver_url.clone();
    }
    if args.headed {
        config.headless = false;
    }
    Ok(config)
}

/// Runs the scrape on its own task and reports progress until it ends.
/// Ctrl-C stops the run before its next page.
async fn run<C: Connector + 'static>(
    scraper: Scraper<C>,
    request: ScrapeRequest,
) -> Result<ScrapeReport, ScrapeError> {
    let mut handle = scraper.spawn(request);
    let mut cancelled = false;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancelled => {
                eprintln!("Stopping after the current page...");
                handle.cancel();
                cancelled = true;
            }
        }
    }

    handle.finish().await
}

fn print_event(event: &ScrapeEvent) {
    match event {
        ScrapeEvent::Started { url } => println!("Loading {url}"),
        ScrapeEvent::StrategyDetected(strategy) => println!("Pagination: {strategy}"),
        ScrapeEvent::PageScraped { page, items } => println!("Page {page}: {items} items"),
        ScrapeEvent::Stopped(reason) => println!("Stopped: {reason}"),
    }
}

fn present(report: &ScrapeReport, args: &Args) -> ExitCode {
    for (idx, item) in report.result.items().iter().enumerate() {
        println!("{}. {}", idx + 1, item);
    }

    match report.summary() {
        ScrapeSummary::Scraped(count) => println!("{count} items scraped."),
        ScrapeSummary::NoContent => {
            println!("No Data: no relevant tags found on pages.");
            return ExitCode::SUCCESS;
        }
    }

    if let Some(export_arg) = args.export {
        let format = ExportFormat::from(export_arg);
        let path = args.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}.{}",
                utils::sanitize_filename(report.request.base_url()),
                format.extension()
            ))
        });

        match export::export(&report.result, &path, format) {
            Ok(()) => println!("Saved to {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
