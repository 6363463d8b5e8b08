use std::collections::{HashSet, VecDeque};

use crate::peer::{FetchError, NodeRecord, RawStore, canonical_address};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub address: String,
    /// Direct requests come from an explicit focus and expand their neighbors on
    /// success; frontier requests do not.
    pub direct: bool,
    pub generation: u64,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub request: FetchRequest,
    pub result: Result<NodeRecord, FetchError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Issued before the last reset; nothing was touched.
    Stale,
    /// The address was already loaded; the record was discarded.
    Duplicate,
    Loaded { enqueued: usize },
    Failed,
}

/// Pending-address queue plus dedup/loaded bookkeeping for one crawl run.
///
/// All addresses are canonical before they reach the queue, the dedup set or the
/// store. Every fetch request carries the generation it was issued in, and a reset
/// bumps the generation so late completions from an abandoned run are ignored.
#[derive(Debug, Default)]
pub struct CrawlFrontier {
    queue: VecDeque<String>,
    known: HashSet<String>,
    store: RawStore,
    in_flight: usize,
    loaded: usize,
    generation: u64,
}

impl CrawlFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &RawStore {
        &self.store
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }

    /// One cooperative step: dequeues at most one address. An address that got
    /// loaded while it waited in the queue is consumed without a fetch.
    pub fn pump(&mut self) -> Option<FetchRequest> {
        let address = self.queue.pop_front()?;
        self.start_fetch(address, false)
    }

    /// Explicit user focus on a peer. Loaded peers expand their unknown neighbors
    /// into the queue; anything else becomes a direct fetch.
    pub fn focus(&mut self, address: &str) -> Option<FetchRequest> {
        let address = canonical_address(address);

        if let Some(record) = self.store.get(&address) {
            let neighbors = record.neighbor_ids.clone();
            let enqueued = self.enqueue_unknown(&neighbors);
            tracing::debug!(%address, enqueued, "expanded loaded peer");
            return None;
        }

        self.known.insert(address.clone());
        self.start_fetch(address, true)
    }

    pub fn complete(&mut self, completion: FetchCompletion) -> CompletionOutcome {
        let FetchCompletion { request, result } = completion;
        if request.generation != self.generation {
            tracing::debug!(
                address = %request.address,
                generation = request.generation,
                current = self.generation,
                "dropping completion from an earlier crawl"
            );
            return CompletionOutcome::Stale;
        }

        self.in_flight = self.in_flight.saturating_sub(1);

        let mut record = match result {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(address = %request.address, %error, "portal fetch failed");
                return CompletionOutcome::Failed;
            }
        };

        if self.store.contains(&request.address) {
            tracing::debug!(address = %request.address, "discarding revisit");
            return CompletionOutcome::Duplicate;
        }

        record.id = request.address.clone();
        let neighbors = if request.direct {
            record.neighbor_ids.clone()
        } else {
            Vec::new()
        };

        self.store.insert(record);
        self.loaded += 1;
        let enqueued = self.enqueue_unknown(&neighbors);
        tracing::info!(
            address = %request.address,
            loaded = self.loaded,
            enqueued,
            "loaded peer"
        );

        CompletionOutcome::Loaded { enqueued }
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.known.clear();
        self.store.clear();
        self.in_flight = 0;
        self.loaded = 0;
        self.generation = self.generation.wrapping_add(1);
        tracing::info!(generation = self.generation, "crawl reset");
    }

    fn start_fetch(&mut self, address: String, direct: bool) -> Option<FetchRequest> {
        if self.store.contains(&address) {
            return None;
        }

        self.in_flight += 1;
        Some(FetchRequest {
            address,
            direct,
            generation: self.generation,
        })
    }

    fn enqueue_unknown(&mut self, neighbors: &[String]) -> usize {
        let mut enqueued = 0;
        for neighbor in neighbors {
            let address = canonical_address(neighbor);
            if self.known.insert(address.clone()) {
                self.queue.push_back(address);
                enqueued += 1;
            }
        }
        enqueued
    }
}
