//! `from`/`size` pagination
//!
//! Stateless on the remote side: each page is an independent search at a
//! growing offset. Only usable while `from + size` stays within the
//! remote's max result window; the page reaching the window is shortened
//! to end on it, and a result set reported to extend past it fails there.

use std::sync::Arc;

use sift_core::{Batch, Error, Result, SearchRequest};
use tracing::debug;

use super::{check_page_size, BatchFetcher};
use crate::client::{ready, BoxFuture, SearchClient};

/// Pages through a result set by offset
pub struct OffsetFetcher {
    client: Arc<dyn SearchClient>,
    request: SearchRequest,
    from: usize,
    size: usize,
    max_result_window: usize,
    total: Option<u64>,
}

impl OffsetFetcher {
    /// Create an offset fetcher starting at `request.from`, paging by `request.size`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` if the page size is zero.
    pub fn new(
        client: Arc<dyn SearchClient>,
        request: SearchRequest,
        max_result_window: usize,
    ) -> Result<Self> {
        check_page_size(&request)?;
        Ok(OffsetFetcher {
            client,
            from: request.from,
            size: request.size,
            request,
            max_result_window,
            total: None,
        })
    }

    /// Offset of the most recently submitted page
    pub fn from(&self) -> usize {
        self.from
    }

    /// Page size
    pub fn size(&self) -> usize {
        self.size
    }
}

impl BatchFetcher for OffsetFetcher {
    fn fetch_next(&mut self, previous: Option<&Batch>) -> BoxFuture<Result<Batch>> {
        if let Some(batch) = previous {
            self.from += batch.len();
            if batch.total.is_some() {
                self.total = batch.total;
            }
        }
        // The last in-window page is shrunk to end exactly at the window.
        let size = self.size.min(self.max_result_window.saturating_sub(self.from));
        if size == 0 {
            if matches!(self.total, Some(total) if total <= self.from as u64) {
                return ready(Ok(Batch::empty()));
            }
            debug!(
                target: "sift::fetcher",
                from = self.from,
                size = self.size,
                max_result_window = self.max_result_window,
                "Offset page beyond max result window"
            );
            return ready(Err(Error::OffsetLimitExceeded {
                from: self.from,
                size: self.size,
                max_result_window: self.max_result_window,
            }));
        }
        let request = self.request.clone().with_from(self.from).with_size(size);
        self.client.search(request)
    }
}
