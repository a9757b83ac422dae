//! Strategy behavior through the public facade

use crate::common::*;
use sift::{
    Error, LazySearchSequence, RetrievalConfig, SearchRequest, SearchSession, SharedSequence,
    SortField, Strategy,
};
use std::sync::Arc;
use std::thread;

const STRATEGIES: [Strategy; 3] = [Strategy::Offset, Strategy::Scroll, Strategy::SearchAfter];

fn ids(seq: LazySearchSequence) -> Vec<String> {
    seq.map(|m| m.unwrap().id).collect()
}

#[test]
fn test_strategies_agree_on_sorted_scan() {
    let request = SearchRequest::new(INDEX).with_sort(SortField::desc("year"));
    let mut results = Vec::new();
    for strategy in STRATEGIES {
        let client = library();
        results.push(ids(session(&client, 5, strategy).sequence(request.clone()).unwrap()));
        assert_eq!(client.open_scrolls(), 0);
    }
    assert_eq!(results[0].len(), 12);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}

#[test]
fn test_scoped_sequence_cleans_up() {
    for strategy in STRATEGIES {
        let client = library();
        let session = session(&client, 5, strategy);
        let first_four: Vec<String> = session
            .with_sequence(SearchRequest::new(INDEX), |seq| {
                seq.take(4).map(|m| m.unwrap().id).collect()
            })
            .unwrap();
        assert_eq!(first_four, vec!["b01", "b02", "b03", "b04"]);
        assert_eq!(client.fetch_count(), 2, "strategy {:?}", strategy);
        assert_eq!(client.open_scrolls(), 0);
    }
}

#[test]
fn test_scroll_snapshot_versus_offset_shift() {
    // Deleting an already-delivered document shifts later offset pages.
    let client = library();
    let mut seq = session(&client, 4, Strategy::Offset)
        .sequence(SearchRequest::new(INDEX))
        .unwrap();
    assert_eq!(seq.next().unwrap().unwrap().id, "b01");
    assert!(client.remove("b01"));
    let rest = ids(seq);
    assert_eq!(rest.len(), 10);
    assert!(!rest.contains(&"b09".to_string()));

    let client = library();
    let mut seq = session(&client, 4, Strategy::Scroll)
        .sequence(SearchRequest::new(INDEX))
        .unwrap();
    assert_eq!(seq.next().unwrap().unwrap().id, "b01");
    assert!(client.remove("b01"));
    assert_eq!(ids(seq).len(), 11);
}

#[test]
fn test_offset_window_stops_scan() {
    let client = library();
    let config = RetrievalConfig::default()
        .with_page_size(4)
        .with_max_result_window(10)
        .with_strategy(Strategy::Offset);
    let session = SearchSession::new(client.clone(), runtime().handle().clone(), config).unwrap();

    let results: Vec<_> = session.sequence(SearchRequest::new(INDEX)).unwrap().collect();
    assert_eq!(results.len(), 11);
    assert!(results[..10].iter().all(Result::is_ok));
    assert_eq!(results[9].as_ref().unwrap().id, "b10");
    assert!(matches!(
        results[10],
        Err(Error::OffsetLimitExceeded {
            from: 10,
            size: 4,
            max_result_window: 10
        })
    ));
}

#[test]
fn test_shared_consumers_split_the_scan() {
    let client = library();
    let seq = session(&client, 3, Strategy::SearchAfter)
        .sequence(SearchRequest::new(INDEX))
        .unwrap();
    let shared = Arc::new(SharedSequence::new(seq));

    let workers: Vec<_> = (0..3)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || shared.as_ref().map(|m| m.unwrap().id).collect::<Vec<_>>())
        })
        .collect();

    let mut all: Vec<String> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    all.sort();
    let expected: Vec<String> = books().into_iter().map(|(id, _)| id).collect();
    assert_eq!(all, expected);
    assert_eq!(shared.stats().delivered, 12);
}
