use crate::capture::{CapturedResponse, Payload, RawResponse};
use crate::filter::ResponseFilter;
use crate::parsers::item;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Append-only store of data-API responses captured during one run.
///
/// Cloning yields another handle onto the same store. The only mutation is
/// [`on_response`](Self::on_response); readers query by sequence watermark.
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    entries: Arc<RwLock<Vec<Arc<CapturedResponse>>>>,
    filter: Arc<ResponseFilter>,
    started: Instant,
}

impl ResponseBuffer {
    pub fn new(filter: ResponseFilter) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            filter: Arc::new(filter),
            started: Instant::now(),
        }
    }

    /// Store a response if it belongs to the data API.
    ///
    /// Returns the assigned sequence number, or `None` when the filter rejected it.
    /// Bodies that are not JSON are still stored, marked malformed.
    pub async fn on_response(&self, raw: RawResponse) -> Option<u64> {
        if !self.filter.matches(&raw.method, &raw.url, raw.status) {
            ::log::trace!("Ignoring {} {} ({})", raw.method, raw.url, raw.status);
            return None;
        }

        let (payload, identifiers) = match serde_json::from_str(&raw.body) {
            Ok(value) => {
                let ids = item::probe_identifiers(&value);
                (Payload::Json(value), ids)
            }
            Err(e) => (Payload::Malformed(e.to_string()), Vec::new()),
        };

        // Sequence assignment and push happen under one write lock
        let mut entries = self.entries.write().await;
        let sequence = entries.len() as u64;
        entries.push(Arc::new(CapturedResponse {
            sequence,
            elapsed: self.started.elapsed(),
            url: raw.url,
            method: raw.method,
            status: raw.status,
            payload,
            identifiers,
        }));
        ::log::trace!(
            "Buffered response #{} ids={:?}",
            sequence,
            entries[sequence as usize].identifiers
        );

        Some(sequence)
    }

    /// Sequence number the next stored response will receive; used as a watermark
    pub async fn next_sequence(&self) -> u64 {
        self.entries.read().await.len() as u64
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Responses with sequence >= `since`, oldest first
    pub async fn query(&self, since: u64) -> Responses {
        let entries = self.entries.read().await;
        let start = (since as usize).min(entries.len());
        Responses {
            entries: entries[start..].to_vec(),
            pos: 0,
        }
    }
}

/// Finite view over a slice of the buffer taken at query time
#[derive(Debug, Clone)]
pub struct Responses {
    entries: Vec<Arc<CapturedResponse>>,
    pos: usize,
}

impl Responses {
    /// Start iterating from the first entry again
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for Responses {
    type Item = Arc<CapturedResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos)?.clone();
        self.pos += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Responses {}
