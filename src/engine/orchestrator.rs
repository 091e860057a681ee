use crate::capture::ResponseBuffer;
use crate::config::{HarvestConfig, RetryConfig};
use crate::engine::{
    CaptureStatus, InteractionDriver, InteractiveElement, Ledger, Outcome, Segment,
    SegmentLocator,
};
use crate::error::HarvestError;
use crate::filter::ResponseFilter;
use crate::page::BrowserPage;
use crate::results::HarvestOutput;
use crate::utils::backoff_delay;
use std::time::{Duration, Instant};
use tokio::time::Instant as TokioInstant;

/// Where a run is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Init,
    Scanning,
    ProcessingSegment { ordinal: usize, id: String },
    Done,
    /// The page had no structure to traverse
    Failed,
}

/// Drives a whole harvest over one page: scan, click every item, assemble the dataset
pub struct Orchestrator<P: BrowserPage> {
    page: P,
    locator: SegmentLocator,
    driver: InteractionDriver,
    buffer: ResponseBuffer,
    ledger: Ledger,
    retry: RetryConfig,
    total_timeout: Option<Duration>,
    locate_attempts: u32,
    state: RunState,
}

impl<P: BrowserPage> Orchestrator<P> {
    pub fn new(page: P, config: &HarvestConfig) -> Result<Self, HarvestError> {
        let filter = ResponseFilter::new(config.response_filter.clone())?;
        Ok(Self {
            page,
            locator: SegmentLocator::new(
                config.selectors.clone(),
                config.locator.clone(),
                config.key_scope,
            ),
            driver: InteractionDriver::new(config.interaction.clone()),
            buffer: ResponseBuffer::new(filter),
            ledger: Ledger::new(config.retry.max_attempts),
            retry: config.retry.clone(),
            total_timeout: config.total_timeout(),
            locate_attempts: config.locator.attempts.max(1),
            state: RunState::Init,
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Run the traversal.
    ///
    /// Per-item failures end up in the report. The run itself fails only when
    /// the page has no discoverable structure, the browser breaks during the
    /// scan, or the total timeout passes before the scan completes. If it
    /// passes later, the items captured so far are returned and the rest are
    /// reported pending.
    pub async fn run(&mut self) -> Result<HarvestOutput, HarvestError> {
        let started = Instant::now();
        // One deadline covers scanning and traversal
        let deadline = self.total_timeout.map(|limit| TokioInstant::now() + limit);

        self.transition(RunState::Scanning);
        let scan = self.locator.locate_with_retry(&mut self.page);
        let scanned = match deadline {
            Some(at) => tokio::time::timeout_at(at, scan).await.ok(),
            None => Some(scan.await),
        };
        let segments = match scanned {
            Some(Ok(segments)) => segments,
            Some(Err(e)) => {
                self.transition(RunState::Failed);
                return Err(e.into());
            }
            None => {
                self.transition(RunState::Failed);
                return Err(HarvestError::DeadlineExceeded {
                    limit: self.total_timeout.unwrap_or_default(),
                });
            }
        };
        if segments.is_empty() {
            self.transition(RunState::Failed);
            return Err(HarvestError::StructureNotFound {
                attempts: self.locate_attempts,
            });
        }

        let segments = self.register(segments);

        let finished = match deadline {
            Some(at) if TokioInstant::now() >= at => false,
            Some(at) => tokio::time::timeout_at(at, self.traverse(segments))
                .await
                .is_ok(),
            None => {
                self.traverse(segments).await;
                true
            }
        };
        if !finished {
            ::log::warn!("Run timeout reached; returning partial results");
        }

        self.transition(RunState::Done);
        let report = self
            .ledger
            .report(started.elapsed(), self.buffer.len().await);
        ::log::info!(
            "Captured {} items, {} failed, {} pending in {:.2} seconds",
            report.captured,
            report.failed,
            report.pending,
            started.elapsed().as_secs_f64()
        );

        Ok(HarvestOutput {
            items: self.ledger.snapshot(),
            report,
        })
    }

    /// Put every element in the ledger up front, dropping repeated keys
    fn register(&mut self, segments: Vec<Segment<P::Handle>>) -> Vec<Segment<P::Handle>> {
        segments
            .into_iter()
            .map(|mut segment| {
                let ledger = &mut self.ledger;
                segment.elements.retain(|element| {
                    let fresh = ledger.register(&element.key, &element.segment_id, &element.match_id);
                    if !fresh {
                        ::log::debug!("Skipping repeated item {}", element.key);
                    }
                    fresh
                });
                segment
            })
            .collect()
    }

    async fn traverse(&mut self, segments: Vec<Segment<P::Handle>>) {
        for segment in segments {
            self.transition(RunState::ProcessingSegment {
                ordinal: segment.ordinal,
                id: segment.id.clone(),
            });
            ::log::info!(
                "Processing section {} '{}' with {} items",
                segment.ordinal,
                segment.id,
                segment.elements.len()
            );

            let mut captured = 0;
            for element in &segment.elements {
                if self.process_element(element).await == Some(CaptureStatus::Captured) {
                    captured += 1;
                }
            }
            ::log::info!(
                "Finished section '{}'; captured {} of {} items",
                segment.id,
                captured,
                segment.elements.len()
            );
        }
    }

    /// Attempt one element until it settles or runs out of retries
    async fn process_element(
        &mut self,
        element: &InteractiveElement<P::Handle>,
    ) -> Option<CaptureStatus> {
        let mut handle = element.handle.clone();

        loop {
            let outcome = self
                .driver
                .interact(
                    &mut self.page,
                    &self.buffer,
                    &self.ledger,
                    element,
                    &handle,
                )
                .await;
            let stale = matches!(outcome, Outcome::ElementStale);

            let status = self.ledger.record(&element.key, outcome);
            if status != Some(CaptureStatus::Pending) || !self.ledger.should_retry(&element.key) {
                return status;
            }

            let failures = self.ledger.attempts(&element.key);
            let delay = backoff_delay(failures, self.retry.base_delay_ms, self.retry.max_delay_ms);
            ::log::debug!(
                "{}: retrying in {:?} (attempt {} of {})",
                element.key,
                delay,
                failures + 1,
                self.ledger.max_attempts()
            );
            tokio::time::sleep(delay).await;

            if stale {
                match self.locator.relocate(&mut self.page, element).await {
                    Ok(Some(fresh)) => handle = fresh,
                    Ok(None) => ::log::warn!("{}: not found on re-scan", element.key),
                    Err(e) => ::log::warn!("{}: re-scan failed: {}", element.key, e),
                }
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        ::log::info!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
