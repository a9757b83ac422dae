//! Streaming retrieval engine for sift
//!
//! This crate turns a paged remote search protocol into lazy sequences:
//! - SearchClient: Capability a remote index offers (search, scroll, clear-scroll)
//! - Fetchers: Offset, Scroll and SearchAfter continuation strategies
//! - LazySearchSequence: Pull-based iterator with one pipelined fetch in flight
//! - SearchSession: Builds sequences from configuration, guarantees cleanup
//! - Documents / Ids: Decoded views over a sequence
//! - MemoryClient: In-memory backend for tests and local use
//!
//! The engine is the only component that knows about:
//! - Batch boundaries and when the next page is requested
//! - Scroll context lifetime
//! - Sort-key continuation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod documents;
pub mod fetcher;
pub mod memory;
pub mod sequence;
pub mod session;

pub use client::{ready, BoxFuture, SearchClient};
pub use documents::{Decoder, Documents, Ids, JsonDecoder};
pub use fetcher::{BatchFetcher, Fetcher, OffsetFetcher, ScrollFetcher, SearchAfterFetcher};
pub use memory::{ClientCall, MemoryClient};
pub use sequence::{LazySearchSequence, SequenceStats, SharedSequence};
pub use session::SearchSession;
