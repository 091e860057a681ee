use crate::capture::{RawResponse, hook};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, PageError};
use crate::page::{BrowserPage, Dimensions, Position};
use fantoccini::actions::{InputSource, KeyAction, KeyActions};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::Value;
use std::time::Duration;

/// Common alternative WebDriver endpoints tried when the configured one refuses
const FALLBACK_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

const POSITION_SCRIPT: &str = r#"
var rect = arguments[0].getBoundingClientRect();
return [rect.left + window.scrollX, rect.top + window.scrollY];
"#;

const SCROLL_INTO_VIEW_SCRIPT: &str = r#"
arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});
return true;
"#;

const DIMENSIONS_SCRIPT: &str = r#"
return [document.body ? document.body.scrollHeight : 0, window.innerHeight || 0];
"#;

/// A store page opened in a WebDriver session
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Connect, open the store page, wait for it to load and install the response hook
    pub async fn open(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let client = connect_to_webdriver(&config.webdriver_url).await?;
        let page = Self { client };

        ::log::info!("Navigating to {}", config.store_url);
        page.client
            .goto(&config.store_url)
            .await
            .map_err(|e| HarvestError::Navigation {
                url: config.store_url.clone(),
                reason: e.to_string(),
            })?;

        page.wait_until_ready(Duration::from_secs(config.page_load_timeout_secs))
            .await;
        page.install_hook().await?;
        ::log::info!("Page loaded");

        Ok(page)
    }

    /// Wrap an already connected client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// End the WebDriver session
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }

    /// Poll `document.readyState` until complete or the timeout elapses
    async fn wait_until_ready(&self, limit: Duration) {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            match self
                .client
                .execute("return document.readyState === 'complete';", vec![])
                .await
            {
                Ok(value) if value.as_bool().unwrap_or(false) => return,
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        ::log::warn!("Page did not report readyState=complete within {:?}", limit);
    }

    async fn install_hook(&self) -> Result<(), PageError> {
        let already = self
            .client
            .execute(hook::INSTALL_SCRIPT, vec![])
            .await
            .map_err(classify)?;
        ::log::debug!(
            "Response hook {}",
            if already.as_bool().unwrap_or(false) {
                "already present"
            } else {
                "installed"
            }
        );
        Ok(())
    }

    async fn execute_on(&self, script: &str, handle: &Element) -> Result<Value, PageError> {
        let arg = serde_json::to_value(handle).map_err(|e| PageError::Script(e.to_string()))?;
        self.client
            .execute(script, vec![arg])
            .await
            .map_err(classify)
    }
}

impl BrowserPage for WebDriverPage {
    type Handle = Element;

    async fn find_all(&mut self, selector: &str) -> Result<Vec<Element>, PageError> {
        self.client
            .find_all(Locator::Css(selector))
            .await
            .map_err(classify)
    }

    async fn find_within(
        &mut self,
        parent: &Element,
        selector: &str,
    ) -> Result<Vec<Element>, PageError> {
        parent
            .find_all(Locator::Css(selector))
            .await
            .map_err(classify)
    }

    async fn text(&mut self, handle: &Element) -> Result<String, PageError> {
        handle.text().await.map_err(classify)
    }

    async fn outer_html(&mut self, handle: &Element) -> Result<String, PageError> {
        handle.html(false).await.map_err(classify)
    }

    async fn position(&mut self, handle: &Element) -> Result<Position, PageError> {
        let value = self.execute_on(POSITION_SCRIPT, handle).await?;
        let coords = number_pair(&value)
            .ok_or_else(|| PageError::Script(format!("unexpected rect: {}", value)))?;
        Ok(Position::new(coords.0, coords.1))
    }

    async fn scroll_into_view(&mut self, handle: &Element) -> Result<(), PageError> {
        self.execute_on(SCROLL_INTO_VIEW_SCRIPT, handle).await?;
        Ok(())
    }

    async fn click(&mut self, handle: &Element) -> Result<(), PageError> {
        handle.click().await.map_err(classify)
    }

    async fn dismiss(&mut self) -> Result<(), PageError> {
        let escape = KeyActions::new("keyboard".to_string())
            .then(KeyAction::Down {
                value: Key::Escape.into(),
            })
            .then(KeyAction::Up {
                value: Key::Escape.into(),
            });
        self.client.perform_actions(escape).await.map_err(classify)
    }

    async fn scroll_to(&mut self, y: u64) -> Result<(), PageError> {
        self.client
            .execute(&format!("window.scrollTo(0, {});", y), vec![])
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn dimensions(&mut self) -> Result<Dimensions, PageError> {
        let value = self
            .client
            .execute(DIMENSIONS_SCRIPT, vec![])
            .await
            .map_err(classify)?;
        let (document_height, viewport_height) = number_pair(&value)
            .ok_or_else(|| PageError::Script(format!("unexpected dimensions: {}", value)))?;

        Ok(Dimensions {
            document_height: document_height.max(0.0) as u64,
            viewport_height: (viewport_height > 0.0).then_some(viewport_height as u64),
        })
    }

    async fn drain_responses(&mut self) -> Result<Vec<RawResponse>, PageError> {
        let value = self
            .client
            .execute(hook::DRAIN_SCRIPT, vec![])
            .await
            .map_err(classify)?;

        match hook::parse_drained(value) {
            Some(responses) => Ok(responses),
            None => {
                // The page navigated or reloaded and took the hook with it
                ::log::warn!("Response hook missing, reinstalling");
                self.install_hook().await?;
                Ok(Vec::new())
            }
        }
    }
}

/// Connects to the WebDriver instance, trying the usual fallbacks
async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client, HarvestError> {
    let first_error = match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e.to_string()
        }
    };

    for url in FALLBACK_URLS.iter() {
        if *url == webdriver_url {
            continue; // Skip if it's the same as the one we already tried
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(HarvestError::Connect {
        url: webdriver_url.to_string(),
        reason: first_error,
    })
}

/// Map a WebDriver command error onto the engine's categories
fn classify(error: CmdError) -> PageError {
    classify_message(error.to_string())
}

fn classify_message(message: String) -> PageError {
    let lower = message.to_lowercase();
    if lower.contains("stale element") {
        PageError::Stale
    } else if lower.contains("no such element") || lower.contains("unable to locate element") {
        PageError::NotFound(message)
    } else if lower.contains("not interactable") || lower.contains("click intercepted") {
        PageError::NotInteractable(message)
    } else if lower.contains("session") {
        PageError::Session(message)
    } else {
        PageError::Script(message)
    }
}

fn number_pair(value: &Value) -> Option<(f64, f64)> {
    let items = value.as_array()?;
    Some((items.first()?.as_f64()?, items.get(1)?.as_f64()?))
}
