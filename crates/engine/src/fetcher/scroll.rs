//! Scroll-context paging
//!
//! The initial search opens a snapshot-isolated cursor on the remote;
//! every continuation submits the most recently issued scroll id and
//! renews the keep-alive. The context holds remote resources until it
//! expires or is released, so `close` always releases it.

use std::sync::Arc;
use std::time::Duration;

use sift_core::{Batch, Error, Result, ScrollRequest, SearchRequest};
use tracing::{debug, warn};

use super::{check_page_size, BatchFetcher};
use crate::client::{ready, BoxFuture, SearchClient};

/// Pages through a result set with a server-side scroll context
pub struct ScrollFetcher {
    client: Arc<dyn SearchClient>,
    request: SearchRequest,
    keep_alive: Duration,
    scroll_id: Option<String>,
}

impl ScrollFetcher {
    /// Create a scroll fetcher paging by `request.size`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` if the page size is zero.
    pub fn new(
        client: Arc<dyn SearchClient>,
        request: SearchRequest,
        keep_alive: Duration,
    ) -> Result<Self> {
        check_page_size(&request)?;
        Ok(ScrollFetcher {
            client,
            request: request.with_scroll(keep_alive),
            keep_alive,
            scroll_id: None,
        })
    }

    /// Most recently issued scroll id, if a batch has been received
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Keep-alive renewed by each call
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

impl BatchFetcher for ScrollFetcher {
    fn fetch_next(&mut self, previous: Option<&Batch>) -> BoxFuture<Result<Batch>> {
        if previous.is_none() {
            return self.client.search(self.request.clone());
        }
        match &self.scroll_id {
            Some(id) => self
                .client
                .scroll(ScrollRequest::new(id.clone(), self.keep_alive)),
            None => ready(Err(Error::transport(
                "remote did not issue a scroll id for the previous batch",
            ))),
        }
    }

    fn on_batch(&mut self, batch: &Batch) {
        if let Some(id) = &batch.scroll_id {
            self.scroll_id = Some(id.clone());
        }
    }

    fn close(&mut self) -> Option<BoxFuture<()>> {
        let scroll_id = self.scroll_id.take()?;
        let release = self.client.clear_scroll(scroll_id.clone());
        Some(Box::pin(async move {
            match release.await {
                Ok(true) => {
                    debug!(target: "sift::fetcher", scroll_id = %scroll_id, "Scroll context released");
                }
                Ok(false) => {
                    let err = Error::CleanupFailed {
                        scroll_id,
                        reason: "remote reported the context as not freed".into(),
                    };
                    warn!(target: "sift::fetcher", error = %err, "Clear scroll did not succeed");
                }
                Err(e) => {
                    let err = Error::CleanupFailed {
                        scroll_id,
                        reason: e.to_string(),
                    };
                    warn!(target: "sift::fetcher", error = %err, "Clear scroll failed");
                }
            }
        }))
    }
}
