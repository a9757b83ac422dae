//! Core types for sift
//!
//! This crate defines the foundational types used throughout the system:
//! - Match: A single remote hit (id, source payload, sort values)
//! - Batch: One page of matches plus continuation metadata
//! - SearchRequest / ScrollRequest: Query descriptors handed to a remote client
//! - SortField / SortOrder: Sort specification
//! - Error: Error type hierarchy
//! - RetrievalConfig: Paging policy loaded from `sift.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod search_types;

pub use config::{RemoteConfig, RetrievalConfig, Strategy, CONFIG_FILE_NAME};
pub use error::{DecodeError, Error, Result};
pub use search_types::{
    Batch, Match, ScrollRequest, SearchRequest, SortField, SortOrder, DOC_FIELD, ID_FIELD,
};
