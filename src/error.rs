use std::time::Duration;
use thiserror::Error;

/// Failures reported by a browser backend for a single operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    /// The URL could not be loaded (unreachable or malformed)
    #[error("failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait expired before the condition held
    #[error("timed out after {:.1}s waiting for {what}", .after.as_secs_f64())]
    Timeout { what: String, after: Duration },

    /// No interactable element matched before the lookup deadline
    #[error("no interactable element matched {what}")]
    NotFound { what: String },

    /// Moving to or clicking an element failed
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// The session was already released
    #[error("browser session is closed")]
    SessionClosed,

    /// Anything else the driver reported
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

impl From<fantoccini::error::CmdError> for BrowserError {
    fn from(error: fantoccini::error::CmdError) -> Self {
        BrowserError::Protocol(error.to_string())
    }
}

/// Run-level failures. Per-page problems never surface here; the walker turns
/// them into a [`crate::results::StopReason`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Please enter a URL to scrape")]
    EmptyUrl,

    #[error("Please select an HTML tag to scrape")]
    EmptyTag,

    #[error("unsupported tag `{tag}` (expected one of: {expected})")]
    UnsupportedTag { tag: String, expected: String },

    #[error("failed to start browser session: {0}")]
    SessionSetup(String),

    #[error("failed to load {url}: {source}")]
    InitialLoad {
        url: String,
        #[source]
        source: BrowserError,
    },

    /// The spawned run ended without reporting back (the task panicked)
    #[error("scrape task ended unexpectedly")]
    Aborted,
}

impl ScrapeError {
    /// Whether the error was raised before any browser work began.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScrapeError::EmptyUrl | ScrapeError::EmptyTag | ScrapeError::UnsupportedTag { .. }
        )
    }
}

/// Failures writing a scrape result to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to save: the scrape produced no items")]
    Empty,

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_includes_duration() {
        let err = BrowserError::Timeout {
            what: "<h2>".to_string(),
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "timed out after 10.0s waiting for <h2>");
    }

    #[test]
    fn test_validation_classification() {
        assert!(ScrapeError::EmptyUrl.is_validation());
        assert!(ScrapeError::EmptyTag.is_validation());
        assert!(!ScrapeError::SessionSetup("no driver".into()).is_validation());
    }
}
