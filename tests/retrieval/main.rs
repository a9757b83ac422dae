//! Retrieval Integration Test Suite
//!
//! End-to-end coverage of the public `sift` facade: configuration files,
//! sessions over every strategy, and the decoding façade.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test retrieval
//!
//! # Configuration tests only
//! cargo test --test retrieval config::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod config;
mod documents;
mod strategies;
