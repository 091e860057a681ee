use crate::error::HarvestError;
use crate::filter::{ResponseFilter, ResponseFilterConfig};
use crate::parsers::html;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Top-level configuration for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Store page to harvest
    pub store_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// CSS selectors used to find sections and items
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Which intercepted responses count as item-detail data
    #[serde(default)]
    pub response_filter: ResponseFilterConfig,

    /// Per-item interaction timing
    #[serde(default)]
    pub interaction: InteractionConfig,

    /// Retry ceiling and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Page scanning behaviour
    #[serde(default)]
    pub locator: LocatorConfig,

    /// How stable keys are scoped
    #[serde(default)]
    pub key_scope: KeyScope,

    /// Maximum runtime; a partial result is returned when it elapses
    #[serde(default)]
    pub total_timeout_secs: Option<u64>,

    /// How long to wait for the store page to finish loading
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,
}

/// CSS selectors for the menu structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Containers that group items into sections (menu categories)
    #[serde(default = "default_section_selector")]
    pub section: String,

    /// Clickable menu items
    #[serde(default = "default_item_selector")]
    pub item: String,

    /// Heading inside a section used to name it
    #[serde(default = "default_heading_selector")]
    pub heading: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// How long to wait for a matching response after a click
    #[serde(default = "default_wait_window")]
    pub wait_window_ms: u64,

    /// Delay between buffer polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause after a click before the first poll
    #[serde(default)]
    pub settle_ms: u64,

    /// Press Escape after each interaction to close the item modal
    #[serde(default = "default_true")]
    pub dismiss_modal: bool,

    /// Top-level JSON keys that mark an item-detail response carrying no identifier
    #[serde(default = "default_shape_keys")]
    pub shape_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per item, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles after each further failure
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Sweep the page top to bottom before scanning so lazy sections render
    #[serde(default = "default_true")]
    pub materialize: bool,

    /// Pause after each sweep step
    #[serde(default = "default_scroll_settle")]
    pub scroll_settle_ms: u64,

    /// Scan attempts before declaring the page structureless
    #[serde(default = "default_locate_attempts")]
    pub attempts: u32,

    /// Pause between scan attempts
    #[serde(default = "default_locate_retry_delay")]
    pub retry_delay_ms: u64,

    /// Used when the viewport height cannot be measured
    #[serde(default = "default_viewport_height")]
    pub default_viewport_height: u64,
}

/// Scope of the stable key derived for each item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    /// Section id plus item label; the same item listed in two sections is captured twice
    #[default]
    Segment,
    /// Item label only; an item is captured once no matter how many sections list it
    Page,
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_section_selector() -> String {
    r#"[data-anchor-id="MenuCategory"], section"#.to_string()
}

fn default_item_selector() -> String {
    r#"[data-anchor-id="MenuItem"]"#.to_string()
}

fn default_heading_selector() -> String {
    r#"h2, h3, [data-testid="CategoryName"]"#.to_string()
}

fn default_wait_window() -> u64 {
    6000
}

fn default_poll_interval() -> u64 {
    150
}

fn default_true() -> bool {
    true
}

fn default_shape_keys() -> Vec<String> {
    vec!["data".to_string()]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    8000
}

fn default_scroll_settle() -> u64 {
    1500
}

fn default_locate_attempts() -> u32 {
    3
}

fn default_locate_retry_delay() -> u64 {
    2000
}

fn default_viewport_height() -> u64 {
    1000
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            section: default_section_selector(),
            item: default_item_selector(),
            heading: default_heading_selector(),
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            wait_window_ms: default_wait_window(),
            poll_interval_ms: default_poll_interval(),
            settle_ms: 0,
            dismiss_modal: true,
            shape_keys: default_shape_keys(),
        }
    }
}

impl InteractionConfig {
    pub fn wait_window(&self) -> Duration {
        Duration::from_millis(self.wait_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            materialize: true,
            scroll_settle_ms: default_scroll_settle(),
            attempts: default_locate_attempts(),
            retry_delay_ms: default_locate_retry_delay(),
            default_viewport_height: default_viewport_height(),
        }
    }
}

impl HarvestConfig {
    /// Create a new configuration with default values
    pub fn new(store_url: &str) -> Self {
        Self {
            store_url: store_url.to_string(),
            webdriver_url: default_webdriver_url(),
            selectors: SelectorConfig::default(),
            response_filter: ResponseFilterConfig::default(),
            interaction: InteractionConfig::default(),
            retry: RetryConfig::default(),
            locator: LocatorConfig::default(),
            key_scope: KeyScope::default(),
            total_timeout_secs: None,
            page_load_timeout_secs: default_page_load_timeout(),
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HarvestError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, HarvestError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<(), HarvestError> {
        Url::parse(&self.store_url)
            .map_err(|e| HarvestError::Config(format!("store_url {}: {}", self.store_url, e)))?;
        if self.retry.max_attempts == 0 {
            return Err(HarvestError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.interaction.poll_interval_ms == 0 {
            return Err(HarvestError::Config(
                "interaction.poll_interval_ms must be positive".to_string(),
            ));
        }
        for (name, selector) in [
            ("section", &self.selectors.section),
            ("item", &self.selectors.item),
            ("heading", &self.selectors.heading),
        ] {
            if !html::is_valid_selector(selector) {
                return Err(HarvestError::Config(format!(
                    "selectors.{} is not a valid CSS selector: {:?}",
                    name, selector
                )));
            }
        }
        ResponseFilter::new(self.response_filter.clone())?;
        Ok(())
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout_secs.map(Duration::from_secs)
    }
}
