use super::PaginationPlan;
use super::urls;
use crate::browser::{Browser, ControlQuery};
use crate::config::ELEMENT_WAIT;
use crate::error::BrowserError;

/// Decides how the loaded page paginates.
///
/// Hints are tried strictly in order and the first one that locates an
/// interactable control wins. A hint whose lookup times out or fails is
/// skipped for good. With no control found, the plan falls back to URL
/// patterns. Nothing is clicked or navigated here.
pub async fn detect<B, S>(browser: &mut B, base_url: &str, hints: &[S]) -> PaginationPlan<B::Element>
where
    B: Browser,
    S: AsRef<str> + Sync,
{
    for hint in hints {
        let query = ControlQuery::new(hint.as_ref());
        match browser.find_interactable(&query, ELEMENT_WAIT).await {
            Ok(control) => {
                ::log::info!("Found pagination control for hint \"{}\"", query.token());
                return PaginationPlan::ButtonDriven {
                    control,
                    hint: query.token().to_string(),
                };
            }
            Err(BrowserError::NotFound { .. } | BrowserError::Timeout { .. }) => {
                ::log::debug!("No interactable control for hint \"{}\"", query.token());
            }
            Err(e) => {
                ::log::warn!("Lookup for hint \"{}\" failed: {}", query.token(), e);
            }
        }
    }

    let uses_placeholder = urls::uses_placeholder(base_url);
    ::log::info!(
        "No pagination control found, using URL pattern (placeholder: {})",
        uses_placeholder
    );
    PaginationPlan::UrlPattern { uses_placeholder }
}
