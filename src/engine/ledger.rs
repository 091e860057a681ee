use crate::capture::CapturedResponse;
use crate::engine::Outcome;
use crate::error::CaptureError;
use crate::parsers::{self, DecodedItem};
use crate::results::{FailedKey, MenuDataset, MenuItem, RunReport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Pending,
    /// Terminal success
    Captured,
    /// Terminal failure
    Failed,
}

/// Capture state of one stable key
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub key: String,
    pub segment_id: String,
    pub status: CaptureStatus,
    pub attempts: u32,
    pub item: Option<DecodedItem>,
    pub response: Option<Arc<CapturedResponse>>,
    /// Latest failure; the terminal reason once FAILED
    pub error: Option<CaptureError>,
}

/// Maps stable keys to capture state and remembers which responses are spoken for.
///
/// Keys move PENDING -> CAPTURED or PENDING -> FAILED and never back.
#[derive(Debug)]
pub struct Ledger {
    max_attempts: u32,
    records: HashMap<String, CaptureRecord>,
    /// Registration order, which is traversal order
    order: Vec<String>,
    /// Buffer sequences already attributed to some key
    claimed: HashSet<u64>,
    /// Normalised labels of every registered item
    match_ids: HashSet<String>,
}

impl Ledger {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            records: HashMap::new(),
            order: Vec::new(),
            claimed: HashSet::new(),
            match_ids: HashSet::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Start tracking a key and the label its responses are expected to carry.
    /// Returns false if the key is already known.
    pub fn register(&mut self, key: &str, segment_id: &str, match_id: &str) -> bool {
        if self.records.contains_key(key) {
            return false;
        }
        self.match_ids.insert(match_id.to_string());
        self.records.insert(
            key.to_string(),
            CaptureRecord {
                key: key.to_string(),
                segment_id: segment_id.to_string(),
                status: CaptureStatus::Pending,
                attempts: 0,
                item: None,
                response: None,
                error: None,
            },
        );
        self.order.push(key.to_string());
        true
    }

    /// Apply an interaction outcome to a key and return its resulting status.
    ///
    /// Outcomes for settled keys are absorbed without effect, so a second
    /// matching response for a captured key changes nothing.
    pub fn record(&mut self, key: &str, outcome: Outcome) -> Option<CaptureStatus> {
        let max_attempts = self.max_attempts;
        let Some(record) = self.records.get_mut(key) else {
            ::log::warn!("Outcome for unregistered key {} ignored", key);
            return None;
        };

        if record.status != CaptureStatus::Pending {
            ::log::debug!(
                "Key {} already {:?}; absorbing {} outcome",
                key,
                record.status,
                outcome_name(&outcome)
            );
            return Some(record.status);
        }

        record.attempts += 1;
        match outcome {
            Outcome::Captured(response) => {
                self.claimed.insert(response.sequence);
                match parsers::decode_response(&response) {
                    Ok(item) => {
                        ::log::debug!(
                            "Captured {} from response #{} on attempt {}",
                            key,
                            response.sequence,
                            record.attempts
                        );
                        record.status = CaptureStatus::Captured;
                        record.item = Some(item);
                        record.error = None;
                    }
                    Err(error) => {
                        // Another click would fetch the same undecodable payload
                        ::log::warn!("{}: {}", key, error);
                        record.status = CaptureStatus::Failed;
                        record.error = Some(error);
                    }
                }
                record.response = Some(response);
            }
            Outcome::Timeout { waited } => {
                Self::recoverable(
                    record,
                    CaptureError::InteractionTimeout { waited },
                    max_attempts,
                );
            }
            Outcome::ElementStale => {
                Self::recoverable(record, CaptureError::StaleElement, max_attempts);
            }
        }

        Some(record.status)
    }

    fn recoverable(record: &mut CaptureRecord, error: CaptureError, max_attempts: u32) {
        if record.attempts >= max_attempts {
            ::log::warn!(
                "{} failed after {} attempts: {}",
                record.key,
                record.attempts,
                error
            );
            record.status = CaptureStatus::Failed;
            record.error = Some(CaptureError::RetryExhausted {
                attempts: record.attempts,
                last: Box::new(error),
            });
        } else {
            record.error = Some(error);
        }
    }

    /// Whether another attempt is allowed for this key
    pub fn should_retry(&self, key: &str) -> bool {
        self.records
            .get(key)
            .is_some_and(|r| r.status == CaptureStatus::Pending && r.attempts < self.max_attempts)
    }

    pub fn status(&self, key: &str) -> Option<CaptureStatus> {
        self.records.get(key).map(|r| r.status)
    }

    pub fn attempts(&self, key: &str) -> u32 {
        self.records.get(key).map_or(0, |r| r.attempts)
    }

    pub fn get(&self, key: &str) -> Option<&CaptureRecord> {
        self.records.get(key)
    }

    /// Whether a buffered response has already been attributed to a key
    pub fn is_claimed(&self, sequence: u64) -> bool {
        self.claimed.contains(&sequence)
    }

    /// Whether any identifier names a registered item other than `own`
    pub fn names_other_item(&self, identifiers: &[String], own: &str) -> bool {
        identifiers
            .iter()
            .any(|id| id != own && self.match_ids.contains(id))
    }

    /// Records in traversal order
    pub fn records(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    /// Captured items in traversal order
    pub fn snapshot(&self) -> MenuDataset {
        let items = self
            .records()
            .filter(|r| r.status == CaptureStatus::Captured)
            .filter_map(|r| {
                let item = r.item.as_ref()?;
                let response = r.response.as_ref()?;
                Some(MenuItem {
                    stable_key: r.key.clone(),
                    segment: r.segment_id.clone(),
                    name: item.name.clone(),
                    price: item.price.clone(),
                    price_cents: item.price_cents,
                    description: item.description.clone(),
                    options: item.options.clone(),
                    item_id: item.id.clone(),
                    sequence: response.sequence,
                    raw: response.json().cloned().unwrap_or_default(),
                })
            })
            .collect();
        MenuDataset::new(items)
    }

    /// Counts and failed keys for the run report
    pub fn report(&self, elapsed: Duration, responses_buffered: usize) -> RunReport {
        let mut report = RunReport {
            elapsed_ms: elapsed.as_millis() as u64,
            responses_buffered,
            ..RunReport::default()
        };

        for record in self.records() {
            match record.status {
                CaptureStatus::Captured => report.captured += 1,
                CaptureStatus::Failed => {
                    report.failed += 1;
                    report.failed_keys.push(FailedKey {
                        key: record.key.clone(),
                        segment: record.segment_id.clone(),
                        attempts: record.attempts,
                        reason: record
                            .error
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                    });
                }
                CaptureStatus::Pending => {
                    report.pending += 1;
                    report.pending_keys.push(record.key.clone());
                }
            }
        }
        report.complete = report.failed == 0 && report.pending == 0;
        report
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Captured(_) => "captured",
        Outcome::Timeout { .. } => "timeout",
        Outcome::ElementStale => "stale",
    }
}
