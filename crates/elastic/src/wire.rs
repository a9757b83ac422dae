//! Request rendering and response parsing for the Elasticsearch REST API
//!
//! Pure functions over `serde_json::Value`; the HTTP side lives in
//! [`crate::client`].

use std::time::Duration;

use serde_json::{json, Map, Value};
use sift_core::{Batch, Error, Match, Result, ScrollRequest, SearchRequest};

/// Default ceiling on `from + size` when a rejection does not state it
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

const SCROLL_MISSING: &str = "search_context_missing_exception";
const WINDOW_TOO_LARGE: &str = "max_result_window";

// ============================================================================
// Requests
// ============================================================================

/// Keep-alive in the remote's time-unit syntax
pub fn keep_alive(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

/// Path of a search call, scroll keep-alive included
pub fn search_path(request: &SearchRequest) -> String {
    match request.scroll {
        Some(ttl) => format!("/{}/_search?scroll={}", request.index, keep_alive(ttl)),
        None => format!("/{}/_search", request.index),
    }
}

/// Body of a search call.
///
/// `from` is omitted when zero or when the page is positioned by a scroll
/// context or `search_after`, which both reject a non-zero offset.
pub fn search_body(request: &SearchRequest) -> Value {
    let mut body = Map::new();
    if let Some(query) = &request.query {
        body.insert("query".into(), query.clone());
    }
    if !request.sort.is_empty() {
        let sort: Vec<Value> = request
            .sort
            .iter()
            .map(|s| {
                let mut clause = Map::new();
                clause.insert(s.field.clone(), json!({ "order": s.order.as_str() }));
                Value::Object(clause)
            })
            .collect();
        body.insert("sort".into(), Value::Array(sort));
    }
    body.insert("size".into(), json!(request.size));
    if request.from > 0 && request.scroll.is_none() && request.search_after.is_none() {
        body.insert("from".into(), json!(request.from));
    }
    if let Some(after) = &request.search_after {
        body.insert("search_after".into(), Value::Array(after.clone()));
    }
    if !request.fetch_source {
        body.insert("_source".into(), Value::Bool(false));
    }
    if request.size == 0 {
        body.insert("track_total_hits".into(), Value::Bool(true));
    }
    Value::Object(body)
}

/// Body of a scroll continuation
pub fn scroll_body(request: &ScrollRequest) -> Value {
    json!({
        "scroll": keep_alive(request.keep_alive),
        "scroll_id": request.scroll_id,
    })
}

/// Body of a clear-scroll call
pub fn clear_scroll_body(scroll_id: &str) -> Value {
    json!({ "scroll_id": [scroll_id] })
}

// ============================================================================
// Responses
// ============================================================================

/// Parse a search or scroll response into a batch
pub fn parse_batch(response: &Value) -> Result<Batch> {
    let hits = response
        .get("hits")
        .ok_or_else(|| Error::transport("malformed response: missing hits"))?;
    let entries = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::transport("malformed response: missing hits.hits"))?;

    let matches = entries.iter().map(parse_hit).collect::<Result<Vec<_>>>()?;
    let mut batch = Batch::new(matches);

    // Reported either as a bare number or as `{"value": n, "relation": ..}`.
    // A `gte` value is only a lower bound and is not kept.
    let total = hits.get("total").and_then(|t| {
        t.as_u64().or_else(|| {
            let exact = t.get("relation").and_then(Value::as_str) != Some("gte");
            t.get("value").and_then(Value::as_u64).filter(|_| exact)
        })
    });
    if let Some(total) = total {
        batch = batch.with_total(total);
    }
    if let Some(id) = response.get("_scroll_id").and_then(Value::as_str) {
        batch = batch.with_scroll_id(id);
    }
    Ok(batch)
}

fn parse_hit(hit: &Value) -> Result<Match> {
    let id = hit
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::transport("malformed response: hit without _id"))?;
    let mut m = Match::new(id);
    if let Some(source) = hit.get("_source") {
        m = m.with_source(source.clone());
    }
    if let Some(sort) = hit.get("sort").and_then(Value::as_array) {
        m = m.with_sort(sort.clone());
    }
    Ok(m)
}

/// Parse a clear-scroll response: whether any context was freed
pub fn parse_cleared(response: &Value) -> bool {
    let succeeded = response
        .get("succeeded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    match response.get("num_freed").and_then(Value::as_u64) {
        Some(freed) => succeeded && freed > 0,
        None => succeeded,
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Map a non-success response to the error taxonomy.
///
/// `page` carries `(from, size)` of the rejected search, if it was one.
pub fn classify_error(status: u16, body: &str, page: Option<(usize, usize)>) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let mut types: Vec<&str> = Vec::new();
    let mut reasons: Vec<&str> = Vec::new();
    if let Some(error) = error {
        collect_causes(error, &mut types, &mut reasons);
    }
    let reason = reasons
        .first()
        .copied()
        .or_else(|| error.and_then(Value::as_str))
        .unwrap_or(body);

    if types.contains(&SCROLL_MISSING) || body.contains(SCROLL_MISSING) {
        return Error::ScrollExpired(reason.to_string());
    }
    if let Some((from, size)) = page {
        if let Some(window) = reasons
            .iter()
            .chain(std::iter::once(&body))
            .find(|r| r.contains(WINDOW_TOO_LARGE))
        {
            return Error::OffsetLimitExceeded {
                from,
                size,
                max_result_window: parse_window(window).unwrap_or(DEFAULT_MAX_RESULT_WINDOW),
            };
        }
    }
    Error::transport(format!("HTTP {}: {}", status, reason))
}

fn collect_causes<'a>(error: &'a Value, types: &mut Vec<&'a str>, reasons: &mut Vec<&'a str>) {
    if let Some(t) = error.get("type").and_then(Value::as_str) {
        types.push(t);
    }
    if let Some(r) = error.get("reason").and_then(Value::as_str) {
        reasons.push(r);
    }
    for key in ["root_cause", "failed_shards"] {
        if let Some(causes) = error.get(key).and_then(Value::as_array) {
            for cause in causes {
                // Shard failures nest the cause object under `reason`.
                let cause = cause.get("reason").filter(|r| r.is_object()).unwrap_or(cause);
                collect_causes(cause, types, reasons);
            }
        }
    }
    if let Some(cause) = error.get("caused_by") {
        collect_causes(cause, types, reasons);
    }
}

/// Extract the window from "... less than or equal to: [10000] but was [10010]"
fn parse_window(reason: &str) -> Option<usize> {
    let start = reason.find('[')? + 1;
    let end = start + reason[start..].find(']')?;
    reason[start..end].trim().parse().ok()
}
