use crate::parsers::OptionGroup;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One captured menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Render-independent key of the item that was clicked
    pub stable_key: String,

    /// Section the item was listed under
    pub segment: String,

    pub name: String,

    /// Price as displayed (if available)
    pub price: Option<String>,

    /// Price in minor units (if available)
    pub price_cents: Option<i64>,

    pub description: Option<String>,

    #[serde(default)]
    pub options: Vec<OptionGroup>,

    /// Identifier assigned by the store's API
    pub item_id: Option<String>,

    /// Buffer sequence number of the response the item was decoded from
    pub sequence: u64,

    /// The response payload as received
    pub raw: Value,
}

/// Captured items in section-then-position order, one per stable key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuDataset {
    items: Vec<MenuItem>,
}

impl MenuDataset {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<MenuItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.stable_key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.stable_key == key)
    }
}

/// A key that ended FAILED
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedKey {
    pub key: String,
    pub segment: String,
    pub attempts: u32,
    pub reason: String,
}

/// Outcome counts of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub captured: usize,
    pub failed: usize,
    /// Keys never settled because the run deadline passed
    pub pending: usize,
    pub failed_keys: Vec<FailedKey>,
    pub pending_keys: Vec<String>,
    /// True only when every discovered key was captured
    pub complete: bool,
    pub elapsed_ms: u64,
    pub responses_buffered: usize,
}

/// Everything a run hands back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestOutput {
    pub items: MenuDataset,
    pub report: RunReport,
}
