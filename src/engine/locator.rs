use crate::config::{KeyScope, LocatorConfig, SelectorConfig};
use crate::engine::{InteractiveElement, Segment};
use crate::error::PageError;
use crate::page::{BrowserPage, Position};
use crate::parsers::html;
use crate::utils::{normalize_label, primary_label, slugify, stable_key, sweep_steps};
use std::collections::HashSet;
use std::time::Duration;

/// Id of the single segment produced when items exist but no section containers do
pub const FALLBACK_SEGMENT_ID: &str = "menu";

/// Finds menu sections and the items inside them, in reading order
#[derive(Debug, Clone)]
pub struct SegmentLocator {
    selectors: SelectorConfig,
    config: LocatorConfig,
    key_scope: KeyScope,
}

/// Item found during a scan, before it is assigned a segment
struct Candidate<H> {
    handle: H,
    label: String,
    position: Position,
}

impl<H> Candidate<H> {
    /// Identifies the same DOM node when it is reachable from nested containers
    fn fingerprint(&self) -> (String, i64, i64) {
        (
            self.label.clone(),
            self.position.x.round() as i64,
            self.position.y.round() as i64,
        )
    }
}

impl SegmentLocator {
    pub fn new(selectors: SelectorConfig, config: LocatorConfig, key_scope: KeyScope) -> Self {
        Self {
            selectors,
            config,
            key_scope,
        }
    }

    /// Sweep the document one viewport at a time so lazily rendered sections
    /// exist before scanning, then return to the top.
    pub async fn materialize<P: BrowserPage>(&self, page: &mut P) -> Result<(), PageError> {
        let dims = page.dimensions().await?;
        let viewport = dims
            .viewport_height
            .unwrap_or(self.config.default_viewport_height);
        let steps = sweep_steps(dims.document_height, viewport);
        ::log::info!(
            "Document height: {}px, viewport: {}px, sweeping {} sections",
            dims.document_height,
            viewport,
            steps
        );

        let settle = Duration::from_millis(self.config.scroll_settle_ms);
        for step in 0..steps {
            page.scroll_to(step * viewport).await?;
            tokio::time::sleep(settle).await;
        }
        page.scroll_to(0).await?;
        Ok(())
    }

    /// Scan the page, retrying on an empty result.
    ///
    /// An empty vector after all attempts means the page has no recognisable
    /// structure; deciding whether that is fatal is up to the caller.
    pub async fn locate_with_retry<P: BrowserPage>(
        &self,
        page: &mut P,
    ) -> Result<Vec<Segment<P::Handle>>, PageError> {
        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            if self.config.materialize {
                self.materialize(page).await?;
            }

            let segments = self.locate_segments(page).await?;
            if !segments.is_empty() {
                return Ok(segments);
            }

            ::log::warn!(
                "Scan attempt {}/{} found no menu sections",
                attempt,
                attempts
            );
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }
        Ok(Vec::new())
    }

    /// One scan of the currently rendered page
    pub async fn locate_segments<P: BrowserPage>(
        &self,
        page: &mut P,
    ) -> Result<Vec<Segment<P::Handle>>, PageError> {
        let containers = page.find_all(&self.selectors.section).await?;

        // Scan every container first so nested containers can be resolved
        let mut scanned = Vec::with_capacity(containers.len());
        for container in containers {
            match self.scan_container(page, &container).await {
                Ok(Some(found)) => scanned.push(found),
                Ok(None) => {}
                // a container that re-rendered mid-scan is picked up on the next scan
                Err(e) if e.is_element_level() => {
                    ::log::debug!("Skipping container that went away: {}", e)
                }
                Err(e) => return Err(e),
            }
        }

        let mut segments = self.assign_items(scanned);

        if segments.is_empty() {
            let loose = page.find_all(&self.selectors.item).await?;
            let candidates = self.candidates(page, loose).await?;
            if !candidates.is_empty() {
                ::log::info!(
                    "No section containers; treating {} items as one section",
                    candidates.len()
                );
                segments.push(self.build_segment(
                    FALLBACK_SEGMENT_ID.to_string(),
                    0,
                    Position::default(),
                    candidates,
                ));
            }
        }

        ::log::info!(
            "Found {} sections with {} items",
            segments.len(),
            segments.iter().map(|s| s.elements.len()).sum::<usize>()
        );
        Ok(segments)
    }

    /// Find a fresh handle for an element whose handle went stale
    pub async fn relocate<P: BrowserPage>(
        &self,
        page: &mut P,
        element: &InteractiveElement<P::Handle>,
    ) -> Result<Option<P::Handle>, PageError> {
        page.scroll_to(element.position.y.max(0.0) as u64).await?;
        let segments = self.locate_segments(page).await?;
        Ok(segments
            .into_iter()
            .flat_map(|s| s.elements)
            .find(|e| e.key == element.key)
            .map(|e| e.handle))
    }

    async fn scan_container<P: BrowserPage>(
        &self,
        page: &mut P,
        container: &P::Handle,
    ) -> Result<Option<(Option<String>, Position, Vec<Candidate<P::Handle>>)>, PageError> {
        let items = page.find_within(container, &self.selectors.item).await?;
        if items.is_empty() {
            return Ok(None);
        }

        let position = page.position(container).await?;
        let heading = html::heading_text(
            &page.outer_html(container).await?,
            &self.selectors.heading,
        );
        let candidates = self.candidates(page, items).await?;
        Ok(Some((heading, position, candidates)))
    }

    /// Label and position every item handle, dropping items with no text
    async fn candidates<P: BrowserPage>(
        &self,
        page: &mut P,
        handles: Vec<P::Handle>,
    ) -> Result<Vec<Candidate<P::Handle>>, PageError> {
        let mut candidates = Vec::with_capacity(handles.len());
        for handle in handles {
            let text = match page.text(&handle).await {
                Ok(text) => text,
                Err(e) if e.is_element_level() => continue,
                Err(e) => return Err(e),
            };
            let Some(label) = primary_label(&text) else {
                ::log::trace!("Skipping item without text");
                continue;
            };
            let position = match page.position(&handle).await {
                Ok(position) => position,
                Err(e) if e.is_element_level() => continue,
                Err(e) => return Err(e),
            };
            candidates.push(Candidate {
                handle,
                label,
                position,
            });
        }
        candidates.sort_by(|a, b| a.position.reading_order(&b.position));
        Ok(candidates)
    }

    /// Give each item to the innermost container listing it, then order everything
    fn assign_items<H>(
        &self,
        mut scanned: Vec<(Option<String>, Position, Vec<Candidate<H>>)>,
    ) -> Vec<Segment<H>> {
        // Innermost containers list the fewest items
        scanned.sort_by_key(|(_, _, items)| items.len());

        let mut claimed = HashSet::new();
        let mut kept = Vec::with_capacity(scanned.len());
        for (heading, position, items) in scanned {
            let items: Vec<_> = items
                .into_iter()
                .filter(|c| claimed.insert(c.fingerprint()))
                .collect();
            if !items.is_empty() {
                kept.push((heading, position, items));
            }
        }
        kept.sort_by(|a, b| a.1.reading_order(&b.1));

        let mut used_ids = HashSet::new();
        kept.into_iter()
            .enumerate()
            .map(|(ordinal, (heading, position, items))| {
                let base = heading
                    .as_deref()
                    .map(slugify)
                    .filter(|slug| !slug.is_empty())
                    .unwrap_or_else(|| format!("section-{}", ordinal + 1));
                let mut id = base.clone();
                let mut suffix = 2;
                while !used_ids.insert(id.clone()) {
                    id = format!("{}-{}", base, suffix);
                    suffix += 1;
                }
                self.build_segment(id, ordinal, position, items)
            })
            .collect()
    }

    fn build_segment<H>(
        &self,
        id: String,
        ordinal: usize,
        position: Position,
        candidates: Vec<Candidate<H>>,
    ) -> Segment<H> {
        let elements = candidates
            .into_iter()
            .enumerate()
            .map(|(index, c)| InteractiveElement {
                segment_id: id.clone(),
                segment_ordinal: ordinal,
                index,
                match_id: normalize_label(&c.label),
                key: stable_key(self.key_scope, &id, &c.label),
                label: c.label,
                position: c.position,
                handle: c.handle,
            })
            .collect();

        Segment {
            id,
            ordinal,
            position,
            elements,
        }
    }
}
