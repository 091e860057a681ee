//! The browser seam.
//!
//! The engine only talks to the page through [`BrowserPage`]: DOM queries, scrolling,
//! clicking, and draining intercepted responses. [`webdriver::WebDriverPage`] is the
//! live implementation; tests drive the engine with a scripted page instead.

pub mod webdriver;

pub use webdriver::WebDriverPage;

use crate::capture::RawResponse;
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Top-left corner of an element in document coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reading order: top to bottom, then left to right
    pub fn reading_order(&self, other: &Position) -> Ordering {
        self.y
            .total_cmp(&other.y)
            .then_with(|| self.x.total_cmp(&other.x))
    }
}

/// Document and viewport heights in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub document_height: u64,
    /// `None` when the page could not report a usable viewport
    pub viewport_height: Option<u64>,
}

/// A live, scriptable page.
///
/// Handles are only valid until the page re-renders; methods given a dead handle
/// return [`PageError::Stale`].
#[allow(async_fn_in_trait)]
pub trait BrowserPage {
    type Handle: Clone + std::fmt::Debug;

    /// All elements matching a CSS selector, in document order
    async fn find_all(&mut self, selector: &str) -> Result<Vec<Self::Handle>, PageError>;

    /// Elements matching a CSS selector below `parent`
    async fn find_within(
        &mut self,
        parent: &Self::Handle,
        selector: &str,
    ) -> Result<Vec<Self::Handle>, PageError>;

    /// Rendered text content
    async fn text(&mut self, handle: &Self::Handle) -> Result<String, PageError>;

    async fn outer_html(&mut self, handle: &Self::Handle) -> Result<String, PageError>;

    async fn position(&mut self, handle: &Self::Handle) -> Result<Position, PageError>;

    async fn scroll_into_view(&mut self, handle: &Self::Handle) -> Result<(), PageError>;

    async fn click(&mut self, handle: &Self::Handle) -> Result<(), PageError>;

    /// Close whatever the last click opened (Escape key)
    async fn dismiss(&mut self) -> Result<(), PageError>;

    /// Scroll the window to a vertical offset
    async fn scroll_to(&mut self, y: u64) -> Result<(), PageError>;

    async fn dimensions(&mut self) -> Result<Dimensions, PageError>;

    /// Responses intercepted since the previous call
    async fn drain_responses(&mut self) -> Result<Vec<RawResponse>, PageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_order() {
        let mut positions = vec![
            Position::new(300.0, 100.0),
            Position::new(0.0, 100.0),
            Position::new(300.0, 0.0),
            Position::new(0.0, 0.0),
        ];
        positions.sort_by(|a, b| a.reading_order(b));

        assert_eq!(
            positions,
            vec![
                Position::new(0.0, 0.0),
                Position::new(300.0, 0.0),
                Position::new(0.0, 100.0),
                Position::new(300.0, 100.0),
            ]
        );
    }
}
