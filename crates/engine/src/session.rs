//! Search session: the entry point for streaming retrieval.
//!
//! A [`SearchSession`] binds a remote client, the runtime fetches are
//! spawned on, and a [`RetrievalConfig`]. It builds sequences with the
//! configured page size and strategy and offers a scoped form that always
//! releases remote resources.
//!
//! # Usage
//!
//! ```ignore
//! use sift_engine::{MemoryClient, SearchSession};
//! use sift_core::SearchRequest;
//!
//! let session = SearchSession::with_defaults(Arc::new(client), runtime.handle().clone());
//!
//! for m in session.sequence(SearchRequest::new("products"))? {
//!     let m = m?;
//!     println!("{}", m.id);
//! }
//! ```
//!
//! # Runtime
//!
//! Sequences block on spawned fetches, so the runtime must be a
//! multi-thread runtime and sequences must be driven from outside it.

use std::sync::Arc;

use sift_core::{Error, Result, RetrievalConfig, SearchRequest, Strategy};
use tokio::runtime::Handle;
use tracing::debug;

use crate::client::SearchClient;
use crate::documents::{Decoder, Documents, Ids};
use crate::fetcher::Fetcher;
use crate::sequence::LazySearchSequence;

/// Builds lazy sequences over one remote client
#[derive(Clone)]
pub struct SearchSession {
    client: Arc<dyn SearchClient>,
    runtime: Handle,
    config: RetrievalConfig,
}

impl SearchSession {
    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation.
    pub fn new(
        client: Arc<dyn SearchClient>,
        runtime: Handle,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(SearchSession {
            client,
            runtime,
            config,
        })
    }

    /// Create a session with the default configuration
    pub fn with_defaults(client: Arc<dyn SearchClient>, runtime: Handle) -> Self {
        SearchSession {
            client,
            runtime,
            config: RetrievalConfig::default(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Remote client shared by every sequence of this session
    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    /// Open a sequence with the configured strategy.
    ///
    /// Nothing is fetched until the first pull.
    pub fn sequence(&self, request: SearchRequest) -> Result<LazySearchSequence> {
        self.open(self.config.strategy, request)
    }

    /// Open a sequence with an explicit strategy.
    ///
    /// The session's page size replaces `request.size`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` if the request cannot be paged with
    /// `strategy`.
    pub fn open(&self, strategy: Strategy, request: SearchRequest) -> Result<LazySearchSequence> {
        let request = request.with_size(self.config.page_size);
        debug!(
            target: "sift::sequence",
            index = %request.index,
            strategy = strategy.as_str(),
            page_size = request.size,
            "Opening sequence"
        );
        let fetcher = Fetcher::for_strategy(strategy, Arc::clone(&self.client), request, &self.config)?;
        Ok(LazySearchSequence::new(fetcher, self.runtime.clone()))
    }

    /// Open an offset-paged sequence
    pub fn paginate(&self, request: SearchRequest) -> Result<LazySearchSequence> {
        self.open(Strategy::Offset, request)
    }

    /// Open a scroll-context sequence
    pub fn scroll(&self, request: SearchRequest) -> Result<LazySearchSequence> {
        self.open(Strategy::Scroll, request)
    }

    /// Open a search-after sequence
    pub fn search_after(&self, request: SearchRequest) -> Result<LazySearchSequence> {
        self.open(Strategy::SearchAfter, request)
    }

    /// Run `f` over a sequence, closing it when `f` returns.
    ///
    /// Cleanup also runs if `f` panics, when the sequence is dropped during
    /// unwinding.
    pub fn with_sequence<R, G>(&self, request: SearchRequest, f: G) -> Result<R>
    where
        G: FnOnce(&mut LazySearchSequence) -> R,
    {
        let mut sequence = self.sequence(request)?;
        let out = f(&mut sequence);
        sequence.close();
        Ok(out)
    }

    /// Stream decoded elements; undecodable matches are skipped.
    pub fn documents<T, D: Decoder<T>>(
        &self,
        request: SearchRequest,
        decoder: D,
    ) -> Result<Documents<T, D>> {
        Ok(Documents::new(self.sequence(request)?, decoder))
    }

    /// Stream match ids without fetching sources
    pub fn ids(&self, request: SearchRequest) -> Result<Ids> {
        Ok(Ids::new(self.sequence(request.with_fetch_source(false))?))
    }

    /// Number of matches for `request`.
    ///
    /// Issues a single search for zero matches and reads the total the
    /// remote reports. Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or `Error::InvalidRequest` if the remote
    /// does not report a total.
    pub fn count(&self, request: SearchRequest) -> Result<u64> {
        let mut request = request
            .with_from(0)
            .with_size(0)
            .with_fetch_source(false);
        request.scroll = None;
        request.search_after = None;
        request.sort.clear();

        let index = request.index.clone();
        let batch = self.runtime.block_on(self.client.search(request))?;
        batch.total.ok_or_else(|| {
            Error::InvalidRequest(format!("remote reported no total for index {}", index))
        })
    }
}
