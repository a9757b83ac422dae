//! Elasticsearch transport for sift
//!
//! [`ElasticClient`] implements `sift_engine::SearchClient` over the REST
//! search, scroll and clear-scroll endpoints. The [`wire`] module holds the
//! request rendering and response parsing it uses.
//!
//! Remote rejections are mapped onto the shared error taxonomy:
//! - a `from + size` beyond `index.max_result_window` becomes `Error::OffsetLimitExceeded`
//! - `search_context_missing_exception` becomes `Error::ScrollExpired`
//! - everything else becomes `Error::Transport`

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
pub mod wire;

pub use client::ElasticClient;
