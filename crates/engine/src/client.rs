//! Remote search client capability
//!
//! Every remote call is submitted synchronously and completes as a boxed
//! `'static` future, so the caller can spawn it on a runtime and keep
//! working while the request is in flight.

use std::future::Future;
use std::pin::Pin;

use sift_core::{Batch, Result, ScrollRequest, SearchRequest};

/// An owned, sendable future
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Wrap an already-known outcome as a future
pub fn ready<T: Send + 'static>(value: T) -> BoxFuture<T> {
    Box::pin(std::future::ready(value))
}

/// Capability a remote search index must offer to be streamed.
///
/// Implementations are shared read-only across many sequences, so every
/// method takes `&self` and returns a future that owns whatever it needs.
pub trait SearchClient: Send + Sync {
    /// Submit a search; the future resolves to one page of matches.
    fn search(&self, request: SearchRequest) -> BoxFuture<Result<Batch>>;

    /// Continue an open scroll context.
    fn scroll(&self, request: ScrollRequest) -> BoxFuture<Result<Batch>>;

    /// Release a scroll context. Resolves to whether the remote freed it.
    fn clear_scroll(&self, scroll_id: String) -> BoxFuture<Result<bool>>;
}
