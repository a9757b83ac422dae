//! Core search types for batch retrieval
//!
//! This module defines the value types exchanged between the retrieval
//! engine and a remote search index:
//! - SortOrder / SortField: Sort specification of a request
//! - SearchRequest: Query descriptor plus paging parameters
//! - ScrollRequest: Continuation of a server-side scroll context
//! - Match: A single remote hit (id, source payload, sort values)
//! - Batch: One page of matches plus continuation metadata
//!
//! The query itself is opaque to this crate: it is carried as a JSON value
//! and passed unmodified to every fetch of a scan.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Pseudo-field sorting by index order. Cheapest total order for a single shard.
pub const DOC_FIELD: &str = "_doc";

/// Pseudo-field sorting by document identifier.
pub const ID_FIELD: &str = "_id";

// ============================================================================
// SortField
// ============================================================================

/// Direction of a sort criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first (default)
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortOrder {
    /// Wire name of the order
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One criterion of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Field name (or a pseudo-field such as `_doc`)
    pub field: String,
    /// Sort direction
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        SortField {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    /// Ascending index-order sort, the default tie-breaker
    pub fn doc() -> Self {
        SortField::asc(DOC_FIELD)
    }
}

// ============================================================================
// SearchRequest
// ============================================================================

/// Query descriptor for one scan of a remote index
///
/// `query` and `sort` are replayed unchanged on every page; the paging
/// fields (`from`, `size`, `search_after`, `scroll`) are rewritten by the
/// batch fetchers.
///
/// # Examples
///
/// ```
/// use sift_core::{SearchRequest, SortField};
/// use serde_json::json;
///
/// let req = SearchRequest::new("articles")
///     .with_query(json!({"term": {"lang": "en"}}))
///     .with_sort(SortField::desc("published"))
///     .with_size(50);
///
/// assert_eq!(req.index, "articles");
/// assert_eq!(req.size, 50);
/// assert_eq!(req.sort.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index name
    pub index: String,

    /// Opaque filter criteria (`None` matches everything)
    pub query: Option<Value>,

    /// Sort specification, applied in order
    pub sort: Vec<SortField>,

    /// Offset of the first match to return
    pub from: usize,

    /// Page size
    pub size: usize,

    /// Resume strictly after this sort-key tuple
    pub search_after: Option<Vec<Value>>,

    /// Open a scroll context with this keep-alive
    pub scroll: Option<Duration>,

    /// Whether the source payload is returned with each match
    pub fetch_source: bool,
}

impl SearchRequest {
    /// Create a match-all request over `index`
    ///
    /// Default values:
    /// - query: None (match all)
    /// - sort: empty (remote default order)
    /// - from: 0
    /// - size: 10
    /// - fetch_source: true
    pub fn new(index: impl Into<String>) -> Self {
        SearchRequest {
            index: index.into(),
            query: None,
            sort: Vec::new(),
            from: 0,
            size: 10,
            search_after: None,
            scroll: None,
            fetch_source: true,
        }
    }

    /// Builder: set the query
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Builder: append a sort criterion
    pub fn with_sort(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    /// Builder: set the starting offset
    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Builder: set the page size
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Builder: resume after a sort-key tuple
    pub fn with_search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    /// Builder: open a scroll context
    pub fn with_scroll(mut self, keep_alive: Duration) -> Self {
        self.scroll = Some(keep_alive);
        self
    }

    /// Builder: toggle source fetching
    pub fn with_fetch_source(mut self, fetch: bool) -> Self {
        self.fetch_source = fetch;
        self
    }

    /// Check if the sort specification already orders by `field`
    pub fn sorts_by(&self, field: &str) -> bool {
        self.sort.iter().any(|s| s.field == field)
    }
}

// ============================================================================
// ScrollRequest
// ============================================================================

/// Continuation of an open scroll context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Most recently issued scroll id
    pub scroll_id: String,
    /// Keep-alive renewed by this call
    pub keep_alive: Duration,
}

impl ScrollRequest {
    /// Create a scroll continuation
    pub fn new(scroll_id: impl Into<String>, keep_alive: Duration) -> Self {
        ScrollRequest {
            scroll_id: scroll_id.into(),
            keep_alive,
        }
    }
}

// ============================================================================
// Match
// ============================================================================

/// A single remote hit
///
/// Immutable once retrieved. Ownership moves from the batch that produced
/// it to the consumer when it is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Document identifier
    pub id: String,

    /// Source payload, if it was fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,

    /// Sort values, one per sort criterion of the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
}

impl Match {
    /// Create a match with no source and no sort values
    pub fn new(id: impl Into<String>) -> Self {
        Match {
            id: id.into(),
            source: None,
            sort: Vec::new(),
        }
    }

    /// Builder: set the source payload
    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: set the sort values
    pub fn with_sort(mut self, sort: Vec<Value>) -> Self {
        self.sort = sort;
        self
    }
}

// ============================================================================
// Batch
// ============================================================================

/// One page of ordered matches plus continuation metadata
///
/// # Invariant
///
/// An empty batch is the canonical exhaustion signal. Nothing is fetched
/// after one has been observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Matches in remote order
    pub matches: Vec<Match>,

    /// Scroll id issued with this page (scroll strategy only)
    pub scroll_id: Option<String>,

    /// Total number of matches reported by the remote, if tracked
    pub total: Option<u64>,
}

impl Batch {
    /// Create a batch from matches
    pub fn new(matches: Vec<Match>) -> Self {
        Batch {
            matches,
            scroll_id: None,
            total: None,
        }
    }

    /// Create an empty (terminal) batch
    pub fn empty() -> Self {
        Batch::default()
    }

    /// Builder: attach a scroll id
    pub fn with_scroll_id(mut self, scroll_id: impl Into<String>) -> Self {
        self.scroll_id = Some(scroll_id.into());
        self
    }

    /// Builder: attach the reported total
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Check if this is the terminal batch
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of matches in this batch
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Last match in remote order
    pub fn last(&self) -> Option<&Match> {
        self.matches.last()
    }
}

// ============================================================================
// Tests
// ============================================================================
