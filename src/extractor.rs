use crate::browser::Browser;
use crate::error::BrowserError;
use crate::results::PageResult;

/// Collects the rendered text of every `tag` element on the current page.
///
/// Texts are trimmed and empty ones dropped; document order is kept. A page
/// without matches yields an empty result. Only a broken session is an error.
pub async fn extract<B: Browser>(browser: &mut B, tag: &str) -> Result<PageResult, BrowserError> {
    let elements = browser.find_all_by_tag(tag).await?;

    let mut texts = Vec::with_capacity(elements.len());
    for element in &elements {
        texts.push(browser.read_text(element).await?);
    }

    let page = PageResult::from_texts(texts);
    ::log::debug!(
        "Extracted {} of {} <{}> elements",
        page.len(),
        elements.len(),
        tag
    );
    Ok(page)
}
