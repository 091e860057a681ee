// Re-export modules
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod page;
pub mod parsers;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{HarvestConfig, KeyScope};
pub use error::{CaptureError, HarvestError};
pub use results::{HarvestOutput, MenuDataset, MenuItem, RunReport};

use engine::Orchestrator;
use page::WebDriverPage;
use std::path::Path;

/// Main builder for harvesting a store's menu through a WebDriver session
pub struct MenuHarvest {
    config: HarvestConfig,
}

impl MenuHarvest {
    /// Create a new builder for the given store page with default settings
    pub fn new(store_url: &str) -> Self {
        Self {
            config: HarvestConfig::new(store_url),
        }
    }

    /// Apply a configuration
    pub fn with_config(mut self, config: HarvestConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let config = HarvestConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self, HarvestError> {
        let config = HarvestConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    /// Override the store page
    pub fn with_store_url(mut self, store_url: &str) -> Self {
        self.config.store_url = store_url.to_string();
        self
    }

    /// Override the WebDriver endpoint
    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Set the number of attempts per item
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set how long to wait for an item's response after clicking it
    pub fn with_wait_window(mut self, millis: u64) -> Self {
        self.config.interaction.wait_window_ms = millis;
        self
    }

    /// Set the total timeout (maximum runtime)
    pub fn with_total_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.total_timeout_secs = Some(timeout_seconds);
        self
    }

    /// Choose whether items are keyed per section or once per page
    pub fn with_key_scope(mut self, scope: KeyScope) -> Self {
        self.config.key_scope = scope;
        self
    }

    /// The configuration the run will use
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Open the store page and harvest its menu
    pub async fn run(mut self) -> Result<HarvestOutput, HarvestError> {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.config.webdriver_url = webdriver_url;
            }
        }
        self.config.validate()?;

        let page = WebDriverPage::open(&self.config).await?;
        let mut orchestrator = Orchestrator::new(page, &self.config)?;
        let result = orchestrator.run().await;
        orchestrator.into_page().close().await;
        result
    }
}
