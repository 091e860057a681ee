//! Network response capture.
//!
//! Responses reach us on the page's own schedule. [`ResponseBuffer`] is the single
//! place where that is absorbed: every intercepted response goes through
//! [`ResponseBuffer::on_response`], gets a sequence number, and is never touched again.

pub mod buffer;
pub mod hook;

pub use buffer::{ResponseBuffer, Responses};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A response tuple as reported by the interception layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub status: u16,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawResponse {
    pub fn new(method: &str, url: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            status,
            body: body.into(),
        }
    }
}

/// Body of a captured response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Json(Value),
    /// The body was not JSON; kept so the failure stays visible
    Malformed(String),
}

/// One intercepted data-API response. Immutable once buffered.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedResponse {
    /// Arrival order within the run, starting at 0
    pub sequence: u64,

    /// Time since the buffer was created
    pub elapsed: Duration,

    pub url: String,
    pub method: String,
    pub status: u16,
    pub payload: Payload,

    /// Normalised item identifiers found in the payload (names and ids)
    pub identifiers: Vec<String>,
}

impl CapturedResponse {
    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(value) => Some(value),
            Payload::Malformed(_) => None,
        }
    }

    /// Whether the payload names the given normalised identifier
    pub fn identifies(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|id| id == identifier)
    }

    /// A JSON object with one of the given top-level keys
    pub fn is_detail_shaped(&self, shape_keys: &[String]) -> bool {
        match self.json() {
            Some(Value::Object(map)) => shape_keys.iter().any(|k| map.contains_key(k)),
            _ => false,
        }
    }
}
