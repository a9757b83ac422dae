//! `search_after` paging
//!
//! Each page resumes strictly after a sort-key tuple. No remote state is
//! held, and there is no depth ceiling, but there is no snapshot either:
//! concurrent index mutation can shift page boundaries.
//!
//! The sort must be a total order or matches with equal sort values can be
//! skipped or repeated across pages. A tie-breaker field is appended to the
//! sort specification at construction unless it is already present.

use std::sync::Arc;

use serde_json::Value;
use sift_core::{Batch, Error, Match, Result, SearchRequest, SortField};

use super::{check_page_size, BatchFetcher};
use crate::client::{ready, BoxFuture, SearchClient};

/// Pages through a result set with `search_after`
pub struct SearchAfterFetcher {
    client: Arc<dyn SearchClient>,
    request: SearchRequest,
    last_observed: Option<Vec<Value>>,
}

impl SearchAfterFetcher {
    /// Create a search-after fetcher paging by `request.size`.
    ///
    /// `tie_breaker` names the field appended (ascending) to the sort when
    /// it does not already order by it; `None` leaves the sort untouched.
    /// A `search_after` already present on the request is honored by the
    /// first fetch, which resumes an earlier scan.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` if the page size is zero or the
    /// resulting request has no sort.
    pub fn new(
        client: Arc<dyn SearchClient>,
        mut request: SearchRequest,
        tie_breaker: Option<&str>,
    ) -> Result<Self> {
        check_page_size(&request)?;
        if let Some(field) = tie_breaker {
            if !request.sorts_by(field) {
                request.sort.push(SortField::asc(field));
            }
        }
        if request.sort.is_empty() {
            return Err(Error::InvalidRequest(
                "search_after paging requires a sorted request".into(),
            ));
        }
        Ok(SearchAfterFetcher {
            client,
            request,
            last_observed: None,
        })
    }

    /// Sort specification actually sent, tie-breaker included
    pub fn sort(&self) -> &[SortField] {
        &self.request.sort
    }

    /// Sort key of the last match the consumer observed.
    ///
    /// Feeding it back through `SearchRequest::with_search_after` resumes an
    /// abandoned scan right after the last delivered match.
    pub fn resume_after(&self) -> Option<&[Value]> {
        self.last_observed.as_deref()
    }
}

impl BatchFetcher for SearchAfterFetcher {
    fn fetch_next(&mut self, previous: Option<&Batch>) -> BoxFuture<Result<Batch>> {
        // The next page is requested before the consumer reads this one, so
        // the key is the last match of the batch just received.
        let after = previous
            .and_then(Batch::last)
            .map(|m| (m.id.as_str(), m.sort.as_slice()))
            .or_else(|| self.last_observed.as_deref().map(|s| ("", s)));

        match after {
            None => self.client.search(self.request.clone()),
            Some((id, [])) => ready(Err(Error::InvalidRequest(format!(
                "match '{}' carries no sort values to resume after",
                id
            )))),
            Some((_, sort)) => {
                let request = self.request.clone().with_search_after(sort.to_vec());
                self.client.search(request)
            }
        }
    }

    fn on_match_observed(&mut self, observed: &Match) {
        self.last_observed = Some(observed.sort.clone());
    }
}
