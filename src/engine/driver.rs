use crate::capture::{CapturedResponse, ResponseBuffer};
use crate::config::InteractionConfig;
use crate::engine::{InteractiveElement, Ledger, Outcome};
use crate::page::BrowserPage;
use std::sync::Arc;
use tokio::time::Instant;

/// Clicks one element and waits, within a bounded window, for the response it caused
#[derive(Debug, Clone)]
pub struct InteractionDriver {
    config: InteractionConfig,
}

impl InteractionDriver {
    pub fn new(config: InteractionConfig) -> Self {
        Self { config }
    }

    /// Interact with `element` through `handle` and report what happened.
    ///
    /// Only responses that arrive after the click are considered. Among those, a
    /// response naming the element wins. Otherwise the first detail-shaped
    /// response is accepted unless it names another registered item. Responses
    /// the ledger already attributed to some key are skipped.
    pub async fn interact<P: BrowserPage>(
        &self,
        page: &mut P,
        buffer: &ResponseBuffer,
        ledger: &Ledger,
        element: &InteractiveElement<P::Handle>,
        handle: &P::Handle,
    ) -> Outcome {
        if let Err(e) = page.scroll_into_view(handle).await {
            ::log::warn!("{}: cannot scroll into view: {}", element.key, e);
            return Outcome::ElementStale;
        }

        // Anything that arrived before the click must sit below the watermark
        pump(page, buffer).await;
        let since = buffer.next_sequence().await;
        ::log::debug!("{}: clicking, watermark #{}", element.key, since);

        if let Err(e) = page.click(handle).await {
            ::log::warn!("{}: click failed: {}", element.key, e);
            return Outcome::ElementStale;
        }

        if self.config.settle_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.settle_ms)).await;
        }

        let outcome = self.await_response(page, buffer, ledger, element, since).await;

        if self.config.dismiss_modal {
            if let Err(e) = page.dismiss().await {
                ::log::warn!("{}: could not dismiss modal: {}", element.key, e);
            }
        }

        outcome
    }

    async fn await_response<P: BrowserPage>(
        &self,
        page: &mut P,
        buffer: &ResponseBuffer,
        ledger: &Ledger,
        element: &InteractiveElement<P::Handle>,
        since: u64,
    ) -> Outcome {
        let window = self.config.wait_window();
        let started = Instant::now();
        let deadline = started + window;

        loop {
            pump(page, buffer).await;
            if let Some(found) = self.find_match(buffer, ledger, element, since).await {
                ::log::debug!(
                    "{}: matched response #{} after {:?}",
                    element.key,
                    found.sequence,
                    started.elapsed()
                );
                return Outcome::Captured(found);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.config.poll_interval().min(deadline - now)).await;
        }

        ::log::warn!("{}: no matching response within {:?}", element.key, window);
        Outcome::Timeout { waited: window }
    }

    async fn find_match<H>(
        &self,
        buffer: &ResponseBuffer,
        ledger: &Ledger,
        element: &InteractiveElement<H>,
        since: u64,
    ) -> Option<Arc<CapturedResponse>> {
        let mut fallback = None;
        for entry in buffer.query(since).await {
            if ledger.is_claimed(entry.sequence) {
                continue;
            }
            if entry.identifies(&element.match_id) {
                return Some(entry);
            }
            // API names drift from card labels; only a name belonging to another item disqualifies
            if fallback.is_none()
                && entry.is_detail_shaped(&self.config.shape_keys)
                && !ledger.names_other_item(&entry.identifiers, &element.match_id)
            {
                fallback = Some(entry);
                continue;
            }
            ::log::trace!(
                "{}: skipping response #{} ids={:?}",
                element.key,
                entry.sequence,
                entry.identifiers
            );
        }
        fallback
    }
}

/// Move everything the page intercepted into the buffer
async fn pump<P: BrowserPage>(page: &mut P, buffer: &ResponseBuffer) {
    match page.drain_responses().await {
        Ok(responses) => {
            for raw in responses {
                buffer.on_response(raw).await;
            }
        }
        Err(e) => ::log::warn!("Could not drain intercepted responses: {}", e),
    }
}
