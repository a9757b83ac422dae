//! Decoded element streams, ids and counts

use crate::common::*;
use serde_json::json;
use sift::{DecodeError, JsonDecoder, Match, SearchRequest, SortField, Strategy};

#[test]
fn test_books_by_author() {
    let client = library();
    let session = session(&client, 2, Strategy::Scroll);

    let request = SearchRequest::new(INDEX).with_query(json!({ "term": { "author": "gibson" } }));
    let titles: Vec<String> = session
        .documents(request, JsonDecoder::<Book>::new())
        .unwrap()
        .map(|b| b.unwrap().title)
        .collect();
    assert_eq!(titles, vec!["Neuromancer", "Count Zero", "Mona Lisa Overdrive"]);
    assert_eq!(client.open_scrolls(), 0);
}

#[test]
fn test_undecodable_entries_are_skipped() {
    let client = library();
    client.insert("b13", json!({ "title": "Untitled draft" }));
    client.insert("b14", json!({ "title": "Nameless", "author": "anon", "year": "soon" }));
    let session = session(&client, 5, Strategy::Offset);

    let mut docs = session
        .documents(SearchRequest::new(INDEX), JsonDecoder::<Book>::new())
        .unwrap();
    let decoded: Vec<Book> = docs.by_ref().map(|b| b.unwrap()).collect();
    assert_eq!(decoded.len(), 12);
    assert_eq!(docs.skipped(), 2);
    assert_eq!(decoded[0], Book::new("Dune", "herbert", 1965));
}

#[test]
fn test_closure_decoder() {
    let client = library();
    let session = session(&client, 4, Strategy::SearchAfter);

    let decade = |m: &Match| -> Result<(String, u64), DecodeError> {
        let year = m
            .source
            .as_ref()
            .and_then(|s| s["year"].as_u64())
            .ok_or_else(|| DecodeError::new(&m.id, "no year"))?;
        Ok((m.id.clone(), year / 10 * 10))
    };
    let sixties: Vec<String> = session
        .documents::<(String, u64), _>(SearchRequest::new(INDEX), decade)
        .unwrap()
        .map(|r| r.unwrap())
        .filter(|(_, decade)| *decade == 1960)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(sixties, vec!["b01", "b06", "b07", "b08", "b10", "b11"]);
}

#[test]
fn test_ids_in_sort_order() {
    let client = library();
    let session = session(&client, 4, Strategy::Scroll);

    let request = SearchRequest::new(INDEX).with_sort(SortField::desc("year"));
    let ids: Vec<String> = session.ids(request).unwrap().map(|id| id.unwrap()).collect();
    assert_eq!(
        ids,
        vec!["b03", "b09", "b05", "b02", "b12", "b07", "b08", "b10", "b11", "b01", "b06", "b04"]
    );
}

#[test]
fn test_count() {
    let client = library();
    let session = session(&client, 10, Strategy::Scroll);

    assert_eq!(session.count(SearchRequest::new(INDEX)).unwrap(), 12);
    let delany = SearchRequest::new(INDEX).with_query(json!({ "term": { "author": { "value": "delany" } } }));
    assert_eq!(session.count(delany).unwrap(), 2);
    assert_eq!(client.fetch_count(), 2);
}
