//! sift - lazy batch retrieval over a remote search index
//!
//! sift streams large result sets out of a search index as one lazy,
//! ordered sequence of matches, one page in memory at a time.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{ElasticClient, RetrievalConfig, SearchRequest, SearchSession};
//!
//! let config = RetrievalConfig::from_file("sift.toml".as_ref())?;
//! let client = ElasticClient::from_config(config.remote.as_ref().unwrap());
//! let session = SearchSession::new(Arc::new(client), runtime.handle().clone(), config)?;
//!
//! for m in session.scroll(SearchRequest::new("books"))? {
//!     println!("{}", m?.id);
//! }
//! ```
//!
//! # Architecture
//!
//! - `sift-core`: value types, errors and configuration
//! - `sift-engine`: paging strategies, the sequence core and sessions
//! - `sift-elastic`: the Elasticsearch HTTP transport

pub use sift_core::{
    Batch, DecodeError, Error, Match, RemoteConfig, Result, RetrievalConfig, ScrollRequest,
    SearchRequest, SortField, SortOrder, Strategy, CONFIG_FILE_NAME, DOC_FIELD, ID_FIELD,
};
pub use sift_elastic::ElasticClient;
pub use sift_engine::{
    BatchFetcher, BoxFuture, ClientCall, Decoder, Documents, Fetcher, Ids, JsonDecoder,
    LazySearchSequence, MemoryClient, OffsetFetcher, ScrollFetcher, SearchAfterFetcher,
    SearchClient, SearchSession, SequenceStats, SharedSequence,
};
