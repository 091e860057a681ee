//! The interaction-and-capture engine.
//!
//! [`SegmentLocator`] partitions the page into sections of clickable items,
//! [`InteractionDriver`] clicks one item and watches the [`ResponseBuffer`] for the
//! response it caused, [`Ledger`] keeps per-item capture state, and
//! [`Orchestrator`] runs the whole traversal.
//!
//! [`ResponseBuffer`]: crate::capture::ResponseBuffer

pub mod driver;
pub mod ledger;
pub mod locator;
pub mod orchestrator;

#[cfg(test)]
mod tests;

pub use driver::InteractionDriver;
pub use ledger::{CaptureRecord, CaptureStatus, Ledger};
pub use locator::SegmentLocator;
pub use orchestrator::{Orchestrator, RunState};

use crate::capture::CapturedResponse;
use crate::page::Position;
use std::sync::Arc;
use std::time::Duration;

/// A menu section and the items it held when the page was scanned
#[derive(Debug, Clone)]
pub struct Segment<H> {
    /// Derived from the section heading, or its ordinal when there is none
    pub id: String,
    pub ordinal: usize,
    pub position: Position,
    pub elements: Vec<InteractiveElement<H>>,
}

/// One clickable menu item.
///
/// `handle` dies with the next re-render; everything else identifies the item
/// independently of the DOM.
#[derive(Debug, Clone)]
pub struct InteractiveElement<H> {
    pub segment_id: String,
    pub segment_ordinal: usize,
    /// Index within the segment, in reading order
    pub index: usize,
    pub label: String,
    /// Normalised label, compared against identifiers found in responses
    pub match_id: String,
    pub key: String,
    pub position: Position,
    pub handle: H,
}

/// Result of a single interaction
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A response attributable to the element arrived
    Captured(Arc<CapturedResponse>),
    /// The wait window closed without a matching response
    Timeout { waited: Duration },
    /// The element could not be scrolled to or clicked
    ElementStale,
}

impl Outcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, Outcome::Captured(_))
    }
}
