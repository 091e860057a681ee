use std::time::Duration;

use thiserror::Error;

/// Errors that abort a whole harvest run
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The page exposed no sections and no menu items, even after retrying the scan
    #[error("no menu structure found after {attempts} scan attempts")]
    StructureNotFound { attempts: u32 },

    /// The total timeout passed before the page scan finished, so nothing was traversed
    #[error("run timeout of {limit:?} passed while scanning the page")]
    DeadlineExceeded { limit: Duration },

    /// Could not open a WebDriver session
    #[error("failed to connect to WebDriver at {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Navigating to the store page failed
    #[error("failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// A browser command failed outside of a per-item interaction
    #[error("browser error: {0}")]
    Page(#[from] PageError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Why a single menu item could not be captured.
///
/// These never abort a run; they end up in the ledger and the run report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// No matching response arrived within the wait window
    #[error("no matching response within {waited:?}")]
    InteractionTimeout { waited: Duration },

    /// The element handle went away because the page re-rendered
    #[error("element reference went stale")]
    StaleElement,

    /// A response matched but could not be decoded into an item
    #[error("could not decode item payload: {reason}")]
    DecodeFailure { reason: String },

    /// Recoverable failures persisted past the retry ceiling
    #[error("gave up after {attempts} attempts (last: {last})")]
    RetryExhausted {
        attempts: u32,
        last: Box<CaptureError>,
    },
}

/// Errors reported by a [`crate::page::BrowserPage`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The handle refers to an element that is no longer attached to the document
    #[error("stale element reference")]
    Stale,

    #[error("element not found: {0}")]
    NotFound(String),

    /// The element exists but could not receive the interaction (hidden, covered, zero-size)
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// In-page script evaluation failed or returned something unexpected
    #[error("script error: {0}")]
    Script(String),

    /// The WebDriver session itself is broken
    #[error("session error: {0}")]
    Session(String),
}

impl PageError {
    /// Whether re-locating the element and trying again can help
    pub fn is_element_level(&self) -> bool {
        matches!(
            self,
            PageError::Stale | PageError::NotFound(_) | PageError::NotInteractable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_exhausted_message_includes_last_error() {
        let err = CaptureError::RetryExhausted {
            attempts: 3,
            last: Box::new(CaptureError::StaleElement),
        };
        assert_eq!(
            err.to_string(),
            "gave up after 3 attempts (last: element reference went stale)"
        );
    }

    #[test]
    fn test_element_level_classification() {
        assert!(PageError::Stale.is_element_level());
        assert!(PageError::NotInteractable("covered".into()).is_element_level());
        assert!(!PageError::Session("gone".into()).is_element_level());
        assert!(!PageError::Script("boom".into()).is_element_level());
    }
}
