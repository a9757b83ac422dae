//! Pull-based sequence over a paged remote result set
//!
//! [`LazySearchSequence`] turns the asynchronous, page-at-a-time remote
//! protocol into a synchronous stream of matches. It holds the batch being
//! drained, a position within it, and at most one fetch in flight for the
//! batch after it.
//!
//! ## Pipelining
//!
//! As soon as a non-empty batch arrives, the request for the next one is
//! spawned on the runtime before any of the new matches are delivered, so
//! network latency for batch N+1 overlaps the consumer's work on batch N.
//! The caller only blocks when it crosses a batch boundary and the next
//! batch has not arrived yet.
//!
//! ## Termination
//!
//! An empty batch exhausts the sequence for good. Exhaustion, a failed
//! fetch, an explicit [`close`](LazySearchSequence::close), and drop all
//! funnel into the same cleanup, which runs at most once.
//!
//! ## Blocking
//!
//! `advance` blocks the calling thread. It must not be called from inside
//! an async task on the same runtime.

use parking_lot::Mutex;
use sift_core::{Batch, Error, Match, Result};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::fetcher::{BatchFetcher, Fetcher};

/// Counters describing a sequence's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    /// Fetches submitted to the remote
    pub fetches: usize,
    /// Batches received, the terminal one included
    pub batches: usize,
    /// Matches handed to the consumer
    pub delivered: u64,
}

/// Lazy, ordered, single-reader sequence of remote matches
pub struct LazySearchSequence<F: BatchFetcher = Fetcher> {
    fetcher: F,
    runtime: Handle,
    current: std::vec::IntoIter<Match>,
    pending: Option<JoinHandle<Result<Batch>>>,
    opened: bool,
    closed: bool,
    stats: SequenceStats,
}

impl<F: BatchFetcher> LazySearchSequence<F> {
    /// Create a sequence driven by `fetcher`, spawning fetches on `runtime`.
    ///
    /// Nothing is requested until the first pull.
    pub fn new(fetcher: F, runtime: Handle) -> Self {
        LazySearchSequence {
            fetcher,
            runtime,
            current: Vec::new().into_iter(),
            pending: None,
            opened: false,
            closed: false,
            stats: SequenceStats::default(),
        }
    }

    /// Deliver the next match to `action`.
    ///
    /// Returns `Ok(true)` if a match was delivered, `Ok(false)` once the
    /// sequence is exhausted or closed.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the remote call for the next batch
    /// failed. The sequence is closed afterwards and cleanup has been
    /// attempted; later calls return `Ok(false)`.
    pub fn advance<A: FnOnce(Match)>(&mut self, action: A) -> Result<bool> {
        loop {
            if let Some(next) = self.current.next() {
                self.fetcher.on_match_observed(&next);
                self.stats.delivered += 1;
                action(next);
                return Ok(true);
            }
            if self.closed {
                return Ok(false);
            }

            let pending = match self.pending.take() {
                Some(pending) => pending,
                None if !self.opened => {
                    self.opened = true;
                    self.submit(None)
                }
                None => {
                    self.close();
                    return Ok(false);
                }
            };

            let batch = match self.wait(pending) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        target: "sift::sequence",
                        error = %e,
                        fetches = self.stats.fetches,
                        "Fetch failed, closing sequence"
                    );
                    self.close();
                    return Err(e);
                }
            };
            self.stats.batches += 1;
            self.fetcher.on_batch(&batch);
            debug!(
                target: "sift::sequence",
                batch_len = batch.len(),
                fetches = self.stats.fetches,
                "Batch received"
            );

            if batch.is_empty() {
                debug!(
                    target: "sift::sequence",
                    delivered = self.stats.delivered,
                    "Sequence exhausted"
                );
                self.close();
                return Ok(false);
            }

            self.pending = Some(self.submit(Some(&batch)));
            self.current = batch.matches.into_iter();
        }
    }

    /// Stop the sequence and release remote resources.
    ///
    /// The in-flight fetch, if any, is aborted and nothing further is
    /// requested. Idempotent: only the first call, or the first of
    /// exhaustion, failure, and drop, runs the fetcher's cleanup.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let abandoned = self.current.len();
        self.current = Vec::new().into_iter();

        if let Some(release) = self.fetcher.close() {
            if Handle::try_current().is_ok() {
                // Blocking is not allowed inside a runtime; let it finish on its own.
                self.runtime.spawn(release);
            } else {
                self.runtime.block_on(release);
            }
        }
        debug!(
            target: "sift::sequence",
            delivered = self.stats.delivered,
            abandoned,
            fetches = self.stats.fetches,
            "Sequence closed"
        );
    }

    /// Whether cleanup has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Progress counters
    pub fn stats(&self) -> SequenceStats {
        self.stats
    }

    /// Matches of the current batch not yet delivered
    pub fn buffered(&self) -> usize {
        self.current.len()
    }

    /// The fetcher driving this sequence
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Remote paging state is strictly sequential, so a sequence never splits.
    pub fn try_split(&mut self) -> Option<Self> {
        None
    }

    /// Remaining length is not tracked at this layer; reports "unbounded".
    pub fn estimated_len(&self) -> u64 {
        u64::MAX
    }

    fn submit(&mut self, previous: Option<&Batch>) -> JoinHandle<Result<Batch>> {
        self.stats.fetches += 1;
        let fetch = self.fetcher.fetch_next(previous);
        self.runtime.spawn(fetch)
    }

    fn wait(&self, pending: JoinHandle<Result<Batch>>) -> Result<Batch> {
        match self.runtime.block_on(pending) {
            Ok(result) => result,
            Err(e) => Err(Error::transport(format!("fetch task failed: {}", e))),
        }
    }
}

impl<F: BatchFetcher> Iterator for LazySearchSequence<F> {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Result<Match>> {
        let mut delivered = None;
        match self.advance(|m| delivered = Some(m)) {
            Ok(true) => delivered.map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl<F: BatchFetcher> Drop for LazySearchSequence<F> {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// SharedSequence
// ============================================================================

/// A sequence that several consumers can pull from.
///
/// Calls to `advance` are serialized by a mutex, so each match is delivered
/// to exactly one consumer and remote order is preserved across the
/// interleaving of consumers.
pub struct SharedSequence<F: BatchFetcher = Fetcher> {
    inner: Mutex<LazySearchSequence<F>>,
}

impl<F: BatchFetcher> SharedSequence<F> {
    /// Wrap a sequence for shared consumption
    pub fn new(sequence: LazySearchSequence<F>) -> Self {
        SharedSequence {
            inner: Mutex::new(sequence),
        }
    }

    /// Deliver the next match to `action`; see [`LazySearchSequence::advance`].
    pub fn advance<A: FnOnce(Match)>(&self, action: A) -> Result<bool> {
        self.inner.lock().advance(action)
    }

    /// Take the next match, if any
    pub fn next_match(&self) -> Option<Result<Match>> {
        self.inner.lock().next()
    }

    /// Close the underlying sequence
    pub fn close(&self) {
        self.inner.lock().close();
    }

    /// Progress counters
    pub fn stats(&self) -> SequenceStats {
        self.inner.lock().stats()
    }

    /// Unwrap the sequence
    pub fn into_inner(self) -> LazySearchSequence<F> {
        self.inner.into_inner()
    }
}

impl<'a, F: BatchFetcher> Iterator for &'a SharedSequence<F> {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Result<Match>> {
        self.next_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ready, BoxFuture};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed list of batches and counts hook calls.
    struct Scripted {
        batches: VecDeque<Result<Batch>>,
        fetches: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        observed: Vec<String>,
    }

    impl Scripted {
        fn new(pages: &[&[&str]]) -> Self {
            let mut batches: VecDeque<Result<Batch>> = pages
                .iter()
                .map(|page| Ok(Batch::new(page.iter().map(|id| Match::new(*id)).collect())))
                .collect();
            batches.push_back(Ok(Batch::empty()));
            Scripted {
                batches,
                fetches: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
                observed: Vec::new(),
            }
        }

        fn failing_at(mut self, index: usize) -> Self {
            self.batches.insert(index, Err(Error::transport("boom")));
            self
        }
    }

    impl BatchFetcher for Scripted {
        fn fetch_next(&mut self, _previous: Option<&Batch>) -> BoxFuture<Result<Batch>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            ready(self.batches.pop_front().unwrap_or_else(|| Ok(Batch::empty())))
        }

        fn on_match_observed(&mut self, observed: &Match) {
            self.observed.push(observed.id.clone());
        }

        fn close(&mut self) -> Option<BoxFuture<()>> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn drain<F: BatchFetcher>(seq: &mut LazySearchSequence<F>) -> Vec<String> {
        seq.map(|m| m.unwrap().id).collect()
    }

    #[test]
    fn test_delivers_all_matches_in_order() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a", "b"], &["c", "d"], &["e"]]);
        let fetches = fetcher.fetches.clone();
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert_eq!(drain(&mut seq), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(seq.is_closed());
        assert_eq!(seq.fetcher().observed, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(
            seq.stats(),
            SequenceStats {
                fetches: 4,
                batches: 4,
                delivered: 5
            }
        );
    }

    #[test]
    fn test_advance_after_exhaustion_stays_false() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a"]]);
        let fetches = fetcher.fetches.clone();
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert!(seq.advance(|_| {}).unwrap());
        assert!(!seq.advance(|_| {}).unwrap());
        assert!(!seq.advance(|_| {}).unwrap());
        assert!(!seq.advance(|_| {}).unwrap());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nothing_fetched_before_first_pull() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a"]]);
        let fetches = fetcher.fetches.clone();
        let closes = fetcher.closes.clone();
        let seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        drop(seq);
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_next_batch_requested_before_delivery() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a", "b"], &["c"]]);
        let fetches = fetcher.fetches.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        let mut first = None;
        assert!(seq.advance(|m| first = Some(m.id)).unwrap());
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(seq.buffered(), 1);

        // Drawing from the loaded batch does not fetch.
        assert!(seq.advance(|_| {}).unwrap());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_result_closes_once() {
        let rt = runtime();
        let fetcher = Scripted::new(&[]);
        let fetches = fetcher.fetches.clone();
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert!(seq.next().is_none());
        seq.close();
        drop(seq);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a", "b"], &["c"]]);
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert!(seq.advance(|_| {}).unwrap());
        seq.close();
        seq.close();
        assert!(!seq.advance(|_| {}).unwrap());
        drop(seq);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_discards_buffered_matches() {
        let rt = runtime();
        let mut seq = LazySearchSequence::new(
            Scripted::new(&[&["a", "b", "c"]]),
            rt.handle().clone(),
        );
        assert!(seq.advance(|_| {}).unwrap());
        assert_eq!(seq.buffered(), 2);
        seq.close();
        assert_eq!(seq.buffered(), 0);
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_fetch_error_propagates_and_closes() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a", "b"], &["c"]]).failing_at(1);
        let fetches = fetcher.fetches.clone();
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert_eq!(seq.next().unwrap().unwrap().id, "a");
        assert_eq!(seq.next().unwrap().unwrap().id, "b");
        let err = seq.next().unwrap().unwrap_err();
        assert!(err.is_transport());
        assert!(seq.is_closed());
        assert!(seq.next().is_none());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_fetch_error() {
        let rt = runtime();
        let fetcher = Scripted::new(&[&["a"]]).failing_at(0);
        let closes = fetcher.closes.clone();
        let mut seq = LazySearchSequence::new(fetcher, rt.handle().clone());

        assert!(seq.advance(|_| {}).is_err());
        assert!(!seq.advance(|_| {}).unwrap());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_splittable_and_unbounded() {
        let rt = runtime();
        let mut seq = LazySearchSequence::new(Scripted::new(&[&["a"]]), rt.handle().clone());
        assert!(seq.try_split().is_none());
        assert_eq!(seq.estimated_len(), u64::MAX);
        assert_eq!(seq.size_hint(), (0, None));
    }

    #[test]
    fn test_shared_sequence_delivers_each_match_once() {
        let rt = runtime();
        let pages: Vec<Vec<String>> = (0..20)
            .map(|p| (0..5).map(|i| format!("m{:03}", p * 5 + i)).collect())
            .collect();
        let page_refs: Vec<Vec<&str>> = pages
            .iter()
            .map(|p| p.iter().map(String::as_str).collect())
            .collect();
        let page_slices: Vec<&[&str]> = page_refs.iter().map(Vec::as_slice).collect();

        let shared = Arc::new(SharedSequence::new(LazySearchSequence::new(
            Scripted::new(&page_slices),
            rt.handle().clone(),
        )));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    for m in &*shared {
                        seen.push(m.unwrap().id);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<String> = Vec::new();
        for handle in handles {
            let seen = handle.join().unwrap();
            // Each consumer sees its share in remote order.
            assert!(seen.windows(2).all(|w| w[0] < w[1]));
            all.extend(seen);
        }
        all.sort();
        let expected: Vec<String> = (0..100).map(|i| format!("m{:03}", i)).collect();
        assert_eq!(all, expected);
        assert_eq!(shared.stats().delivered, 100);
    }
}
