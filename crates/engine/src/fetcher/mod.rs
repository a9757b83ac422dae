//! Batch fetchers: the continuation strategies
//!
//! A [`BatchFetcher`] issues the remote call producing the batch that
//! follows the one just received. The sequence core owns exactly one
//! fetcher and drives it through four hooks:
//!
//! 1. `fetch_next(None)` on first pull, `fetch_next(Some(&batch))` right
//!    after each non-empty batch arrives (pipelining)
//! 2. `on_batch` for every received batch, including the terminal one
//! 3. `on_match_observed` for every match handed to the consumer
//! 4. `close` exactly once, returning an optional release future
//!
//! The three concrete strategies are selected through the tagged
//! [`Fetcher`] enum.

mod offset;
mod scroll;
mod search_after;

pub use offset::OffsetFetcher;
pub use scroll::ScrollFetcher;
pub use search_after::SearchAfterFetcher;

use std::sync::Arc;

use sift_core::{Batch, Match, Result, RetrievalConfig, SearchRequest, Strategy};

use crate::client::{BoxFuture, SearchClient};

/// Strategy-specific continuation logic
pub trait BatchFetcher: Send {
    /// Submit the request for the batch following `previous`.
    ///
    /// `None` means the initial request. Failures that can be detected
    /// before submission resolve as an immediately failed future, so they
    /// surface only when the consumer reaches that batch.
    fn fetch_next(&mut self, previous: Option<&Batch>) -> BoxFuture<Result<Batch>>;

    /// Observe a received batch before any of its matches are delivered.
    fn on_batch(&mut self, _batch: &Batch) {}

    /// Observe a match as it is delivered to the consumer.
    fn on_match_observed(&mut self, _observed: &Match) {}

    /// Release remote resources. Called at most once per sequence.
    fn close(&mut self) -> Option<BoxFuture<()>> {
        None
    }
}

/// The three continuation strategies
pub enum Fetcher {
    /// `from`/`size` pagination
    Offset(OffsetFetcher),
    /// Server-side scroll context
    Scroll(ScrollFetcher),
    /// `search_after` on the last sort-key tuple
    SearchAfter(SearchAfterFetcher),
}

impl Fetcher {
    /// Build the fetcher for `strategy`.
    ///
    /// The request's `size` is taken as the page size.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` if the request cannot be paged with
    /// the chosen strategy.
    pub fn for_strategy(
        strategy: Strategy,
        client: Arc<dyn SearchClient>,
        request: SearchRequest,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let fetcher = match strategy {
            Strategy::Offset => Fetcher::Offset(OffsetFetcher::new(
                client,
                request,
                config.max_result_window,
            )?),
            Strategy::Scroll => Fetcher::Scroll(ScrollFetcher::new(
                client,
                request,
                config.scroll_keep_alive(),
            )?),
            Strategy::SearchAfter => {
                let tie_breaker = config
                    .tie_breaker
                    .then_some(config.tie_breaker_field.as_str());
                Fetcher::SearchAfter(SearchAfterFetcher::new(client, request, tie_breaker)?)
            }
        };
        Ok(fetcher)
    }

    /// Strategy implemented by this fetcher
    pub fn strategy(&self) -> Strategy {
        match self {
            Fetcher::Offset(_) => Strategy::Offset,
            Fetcher::Scroll(_) => Strategy::Scroll,
            Fetcher::SearchAfter(_) => Strategy::SearchAfter,
        }
    }
}

impl BatchFetcher for Fetcher {
    fn fetch_next(&mut self, previous: Option<&Batch>) -> BoxFuture<Result<Batch>> {
        match self {
            Fetcher::Offset(f) => f.fetch_next(previous),
            Fetcher::Scroll(f) => f.fetch_next(previous),
            Fetcher::SearchAfter(f) => f.fetch_next(previous),
        }
    }

    fn on_batch(&mut self, batch: &Batch) {
        match self {
            Fetcher::Offset(f) => f.on_batch(batch),
            Fetcher::Scroll(f) => f.on_batch(batch),
            Fetcher::SearchAfter(f) => f.on_batch(batch),
        }
    }

    fn on_match_observed(&mut self, observed: &Match) {
        match self {
            Fetcher::Offset(f) => f.on_match_observed(observed),
            Fetcher::Scroll(f) => f.on_match_observed(observed),
            Fetcher::SearchAfter(f) => f.on_match_observed(observed),
        }
    }

    fn close(&mut self) -> Option<BoxFuture<()>> {
        match self {
            Fetcher::Offset(f) => f.close(),
            Fetcher::Scroll(f) => f.close(),
            Fetcher::SearchAfter(f) => f.close(),
        }
    }
}

impl From<OffsetFetcher> for Fetcher {
    fn from(f: OffsetFetcher) -> Self {
        Fetcher::Offset(f)
    }
}

impl From<ScrollFetcher> for Fetcher {
    fn from(f: ScrollFetcher) -> Self {
        Fetcher::Scroll(f)
    }
}

impl From<SearchAfterFetcher> for Fetcher {
    fn from(f: SearchAfterFetcher) -> Self {
        Fetcher::SearchAfter(f)
    }
}

/// Reject requests that could never return a match.
fn check_page_size(request: &SearchRequest) -> Result<()> {
    if request.size == 0 {
        return Err(sift_core::Error::InvalidRequest(
            "page size must be greater than 0".into(),
        ));
    }
    Ok(())
}
