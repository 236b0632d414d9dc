use super::{Browser, Connector, ControlQuery};
use crate::config::{BrowserKind, ScraperConfig};
use crate::error::BrowserError;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// How often `find_interactable` re-queries the page while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opens WebDriver sessions, trying the configured server first and then the
/// fallback list.
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    config: ScraperConfig,
}

impl WebDriverConnector {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        if self.config.headless {
            match self.config.browser {
                BrowserKind::Chrome => {
                    caps.insert(
                        "goog:chromeOptions".to_string(),
                        json!({ "args": ["--headless", "--disable-gpu"] }),
                    );
                }
                BrowserKind::Firefox => {
                    caps.insert(
                        "moz:firefoxOptions".to_string(),
                        json!({ "args": ["-headless"] }),
                    );
                }
            }
        }
        caps
    }

    async fn try_connect(&self, webdriver_url: &str) -> Result<Client, String> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        builder
            .connect(webdriver_url)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Connector for WebDriverConnector {
    type Session = WebDriverSession;

    async fn connect(&self) -> Result<WebDriverSession, BrowserError> {
        let primary = self.config.webdriver_url.as_str();
        let primary_error = match self.try_connect(primary).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", primary);
                return Ok(WebDriverSession::new(client));
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", primary, e);
                e
            }
        };

        for url in &self.config.fallback_webdriver_urls {
            if url == primary {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = self.try_connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(WebDriverSession::new(client));
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(BrowserError::Protocol(format!(
            "no WebDriver server reachable (primary {primary}: {primary_error})"
        )))
    }
}

/// A live browser session driven over the WebDriver protocol.
pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&Client, BrowserError> {
        self.client.as_ref().ok_or(BrowserError::SessionClosed)
    }
}

async fn is_interactable(element: &Element) -> bool {
    matches!(element.is_displayed().await, Ok(true))
        && matches!(element.is_enabled().await, Ok(true))
}

#[async_trait]
impl Browser for WebDriverSession {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let client = self.client()?;
        let parsed = Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        client
            .goto(parsed.as_str())
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn find_interactable(
        &mut self,
        query: &ControlQuery,
        timeout: Duration,
    ) -> Result<Element, BrowserError> {
        let client = self.client()?;
        let xpath = query.xpath();
        let deadline = Instant::now() + timeout;

        loop {
            let candidates = client.find_all(Locator::XPath(&xpath)).await?;
            for element in candidates {
                if is_interactable(&element).await {
                    return Ok(element);
                }
            }

            if Instant::now() >= deadline {
                return Err(BrowserError::NotFound {
                    what: format!("hint \"{}\"", query.token()),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_presence(&mut self, tag: &str, timeout: Duration) -> Result<(), BrowserError> {
        let client = self.client()?;
        match client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(tag))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(BrowserError::Timeout {
                what: format!("<{tag}>"),
                after: timeout,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_all_by_tag(&mut self, tag: &str) -> Result<Vec<Element>, BrowserError> {
        let client = self.client()?;
        Ok(client.find_all(Locator::Css(tag)).await?)
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, BrowserError> {
        self.client()?;
        Ok(element.text().await?)
    }

    async fn move_and_click(&mut self, element: &Element) -> Result<(), BrowserError> {
        self.client()?;
        // Element click scrolls the element into view before pressing it
        element
            .click()
            .await
            .map_err(|e| BrowserError::Interaction(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.client.take() {
            Some(client) => {
                client.close().await?;
                ::log::debug!("WebDriver session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
