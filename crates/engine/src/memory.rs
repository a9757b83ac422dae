//! In-memory search backend
//!
//! [`MemoryClient`] implements [`SearchClient`] over a plain list of JSON
//! documents. It mirrors the paging behavior of a real search engine
//! closely enough to exercise every strategy without a network:
//!
//! - match-all and single-field `term` queries
//! - multi-field sort, with `_doc` (insertion order) and `_id` pseudo-fields
//! - `from`/`size` bounded by a max result window
//! - `search_after` on sort-key tuples
//! - scroll contexts that snapshot the result set and issue a fresh id on
//!   every continuation; every id of a context refers to that context
//!
//! Every call is recorded, and a single call can be made to fail, which is
//! what the tests assert against. All futures it returns are already
//! resolved.

use std::cmp::Ordering;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use sift_core::{
    Batch, Error, Match, Result, ScrollRequest, SearchRequest, SortField, SortOrder, DOC_FIELD,
    ID_FIELD,
};
use uuid::Uuid;

use crate::client::{ready, BoxFuture, SearchClient};

/// A call received by a [`MemoryClient`], in submission order
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    /// `search`
    Search(SearchRequest),
    /// `scroll`
    Scroll(ScrollRequest),
    /// `clear_scroll`
    ClearScroll(String),
}

struct Document {
    id: String,
    source: Value,
}

struct ScrollContext {
    hits: Vec<Match>,
    generation: u64,
    position: usize,
    size: usize,
    total: u64,
}

enum QueryFilter<'a> {
    All,
    Term { field: &'a str, value: &'a Value },
}

impl<'a> QueryFilter<'a> {
    fn parse(query: Option<&'a Value>) -> Result<Self> {
        let Some(query) = query else {
            return Ok(QueryFilter::All);
        };
        let clause = query
            .as_object()
            .filter(|o| o.len() == 1)
            .and_then(|o| o.iter().next());
        match clause {
            Some((kind, _)) if kind == "match_all" => Ok(QueryFilter::All),
            Some((kind, body)) if kind == "term" => {
                let (field, value) = body
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .and_then(|o| o.iter().next())
                    .ok_or_else(|| {
                        Error::InvalidRequest("term query needs exactly one field".into())
                    })?;
                // Both `{"f": v}` and `{"f": {"value": v}}` are accepted.
                let value = value.get("value").unwrap_or(value);
                Ok(QueryFilter::Term { field, value })
            }
            _ => Err(Error::InvalidRequest(format!(
                "unsupported query: {}",
                query
            ))),
        }
    }

    fn matches(&self, doc: &Document) -> bool {
        match self {
            QueryFilter::All => true,
            QueryFilter::Term { field, value } => lookup(&doc.source, field) == Some(*value),
        }
    }
}

/// In-memory [`SearchClient`]
pub struct MemoryClient {
    documents: RwLock<Vec<Document>>,
    scrolls: DashMap<String, ScrollContext>,
    calls: Mutex<Vec<ClientCall>>,
    fail_on: Mutex<Option<usize>>,
    max_result_window: usize,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    /// Create an empty index with a max result window of 10 000
    pub fn new() -> Self {
        MemoryClient {
            documents: RwLock::new(Vec::new()),
            scrolls: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            max_result_window: 10_000,
        }
    }

    /// Builder: set the ceiling on `from + size`
    pub fn with_max_result_window(mut self, max: usize) -> Self {
        self.max_result_window = max;
        self
    }

    /// Create an index holding `documents` in order
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let client = Self::new();
        for (id, source) in documents {
            client.insert(id, source);
        }
        client
    }

    /// Index a document. An existing id is replaced in place.
    pub fn insert(&self, id: impl Into<String>, source: Value) {
        let id = id.into();
        let mut documents = self.documents.write();
        match documents.iter_mut().find(|d| d.id == id) {
            Some(doc) => doc.source = source,
            None => documents.push(Document { id, source }),
        }
    }

    /// Remove a document. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|d| d.id != id);
        documents.len() != before
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the call with this zero-based submission index fail with a
    /// transport error.
    pub fn fail_call(&self, index: usize) {
        *self.fail_on.lock() = Some(index);
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().clone()
    }

    /// Number of `search` and `scroll` calls (page fetches)
    pub fn fetch_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| !matches!(c, ClientCall::ClearScroll(_)))
            .count()
    }

    /// Scroll ids passed to `clear_scroll`, in order
    pub fn cleared(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ClientCall::ClearScroll(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of scroll contexts still held
    pub fn open_scrolls(&self) -> usize {
        self.scrolls.len()
    }

    fn record(&self, call: ClientCall) -> Result<()> {
        let mut calls = self.calls.lock();
        let index = calls.len();
        calls.push(call);
        if *self.fail_on.lock() == Some(index) {
            return Err(Error::transport(format!(
                "injected failure on call {}",
                index
            )));
        }
        Ok(())
    }

    fn execute_search(&self, request: &SearchRequest) -> Result<Batch> {
        let mut hits = self.matching(request)?;
        let total = hits.len() as u64;

        if let Some(after) = &request.search_after {
            hits.retain(|m| compare_keys(&m.sort, after, &request.sort) == Ordering::Greater);
        }

        if request.scroll.is_some() {
            let first: Vec<Match> = hits.iter().take(request.size).cloned().collect();
            let key = Uuid::new_v4().simple().to_string();
            let scroll_id = scroll_id(&key, 0);
            self.scrolls.insert(
                key,
                ScrollContext {
                    generation: 0,
                    position: first.len(),
                    hits,
                    size: request.size,
                    total,
                },
            );
            return Ok(Batch::new(first).with_scroll_id(scroll_id).with_total(total));
        }

        // A search-after page is positioned by its key; `from` does not apply.
        let from = if request.search_after.is_some() {
            0
        } else {
            request.from
        };
        if from + request.size > self.max_result_window {
            return Err(Error::OffsetLimitExceeded {
                from,
                size: request.size,
                max_result_window: self.max_result_window,
            });
        }
        let page = hits
            .into_iter()
            .skip(from)
            .take(request.size)
            .collect();
        Ok(Batch::new(page).with_total(total))
    }

    fn execute_scroll(&self, request: &ScrollRequest) -> Result<Batch> {
        let key = context_key(&request.scroll_id);
        let mut context = self.scrolls.get_mut(key).ok_or_else(|| {
            Error::ScrollExpired(format!("no scroll context for id {}", request.scroll_id))
        })?;
        let end = (context.position + context.size).min(context.hits.len());
        let page = context.hits[context.position..end].to_vec();
        context.position = end;
        context.generation += 1;

        let scroll_id = scroll_id(key, context.generation);
        Ok(Batch::new(page).with_scroll_id(scroll_id).with_total(context.total))
    }

    fn matching(&self, request: &SearchRequest) -> Result<Vec<Match>> {
        let filter = QueryFilter::parse(request.query.as_ref())?;
        let documents = self.documents.read();
        let mut hits: Vec<Match> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(position, doc)| Match {
                id: doc.id.clone(),
                source: request.fetch_source.then(|| doc.source.clone()),
                sort: request
                    .sort
                    .iter()
                    .map(|s| field_value(position, doc, &s.field))
                    .collect(),
            })
            .collect();
        if !request.sort.is_empty() {
            hits.sort_by(|a, b| compare_keys(&a.sort, &b.sort, &request.sort));
        }
        Ok(hits)
    }
}

impl SearchClient for MemoryClient {
    fn search(&self, request: SearchRequest) -> BoxFuture<Result<Batch>> {
        let result = self
            .record(ClientCall::Search(request.clone()))
            .and_then(|()| self.execute_search(&request));
        ready(result)
    }

    fn scroll(&self, request: ScrollRequest) -> BoxFuture<Result<Batch>> {
        let result = self
            .record(ClientCall::Scroll(request.clone()))
            .and_then(|()| self.execute_scroll(&request));
        ready(result)
    }

    fn clear_scroll(&self, scroll_id: String) -> BoxFuture<Result<bool>> {
        let result = self
            .record(ClientCall::ClearScroll(scroll_id.clone()))
            .map(|()| self.scrolls.remove(context_key(&scroll_id)).is_some());
        ready(result)
    }
}

fn scroll_id(key: &str, generation: u64) -> String {
    format!("{}.{}", key, generation)
}

fn context_key(scroll_id: &str) -> &str {
    scroll_id.split_once('.').map_or(scroll_id, |(key, _)| key)
}

fn lookup<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |value, key| value.get(key))
}

fn field_value(position: usize, doc: &Document, field: &str) -> Value {
    match field {
        DOC_FIELD => Value::from(position),
        ID_FIELD => Value::String(doc.id.clone()),
        path => lookup(&doc.source, path).cloned().unwrap_or(Value::Null),
    }
}

/// Compare two sort-key tuples under a sort specification.
fn compare_keys(a: &[Value], b: &[Value], spec: &[SortField]) -> Ordering {
    for (i, field) in spec.iter().enumerate() {
        let x = a.get(i).unwrap_or(&Value::Null);
        let y = b.get(i).unwrap_or(&Value::Null);
        let ord = compare_values(x, y, field.order);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// Missing values sort last in either direction.
fn compare_values(x: &Value, y: &Value, order: SortOrder) -> Ordering {
    match (x.is_null(), y.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_present(x, y);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_present(x: &Value, y: &Value) -> Ordering {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(x).cmp(&type_rank(y)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
