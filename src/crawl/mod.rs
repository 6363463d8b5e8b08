mod frontier;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use crate::peer::{PortalFetcher, RawStore, canonical_address};

use frontier::{CompletionOutcome, CrawlFrontier, FetchCompletion, FetchRequest};

/// Drives a [`CrawlFrontier`] from the UI thread.
///
/// Each started request runs on its own worker thread and reports back over a
/// channel that only the UI thread reads, so the frontier is never touched
/// concurrently.
pub struct Crawler {
    frontier: CrawlFrontier,
    fetcher: Arc<dyn PortalFetcher>,
    tx: Sender<FetchCompletion>,
    rx: Receiver<FetchCompletion>,
    root: Option<String>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PortalFetcher>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            frontier: CrawlFrontier::new(),
            fetcher,
            tx,
            rx,
            root: None,
        }
    }

    pub fn store(&self) -> &RawStore {
        self.frontier.store()
    }

    pub fn loaded(&self) -> usize {
        self.frontier.loaded()
    }

    pub fn in_flight(&self) -> usize {
        self.frontier.in_flight()
    }

    pub fn queued(&self) -> usize {
        self.frontier.queued()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.frontier.is_idle()
    }

    /// Abandons the current crawl and starts a new one at `root`.
    pub fn start(&mut self, root: &str) {
        let root = canonical_address(root);
        self.frontier.reset();
        tracing::info!(%root, generation = self.frontier.generation(), "crawl started");
        self.root = Some(root.clone());
        self.focus(&root);
    }

    pub fn reset(&mut self) {
        self.frontier.reset();
        self.root = None;
    }

    pub fn focus(&mut self, address: &str) {
        if let Some(request) = self.frontier.focus(address) {
            self.spawn_fetch(request);
        }
    }

    /// Starts at most one queued fetch. Call once per frame.
    pub fn pump(&mut self) {
        if let Some(request) = self.frontier.pump() {
            self.spawn_fetch(request);
        }
    }

    /// Applies every completion that has arrived so far. Returns whether the store
    /// changed.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    changed |= self.apply(completion);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    fn apply(&mut self, completion: FetchCompletion) -> bool {
        matches!(
            self.frontier.complete(completion),
            CompletionOutcome::Loaded { .. }
        )
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        tracing::debug!(address = %request.address, direct = request.direct, "starting fetch");

        thread::spawn(move || {
            let result = fetcher.fetch_portal(&request.address);
            let _ = tx.send(FetchCompletion { request, result });
        });
    }
}
