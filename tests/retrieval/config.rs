//! Configuration files driving sessions

use crate::common::*;
use sift::{
    ClientCall, ElasticClient, Error, RemoteConfig, RetrievalConfig, SearchRequest, SearchSession,
    SortField, Strategy,
};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(sift::CONFIG_FILE_NAME);

    RetrievalConfig::write_default_if_missing(&path).unwrap();
    let config = RetrievalConfig::from_file(&path).unwrap();
    assert_eq!(config, RetrievalConfig::default());
    assert_eq!(config.strategy, Strategy::Scroll);

    // An existing file is left alone.
    std::fs::write(&path, "page_size = 7\n").unwrap();
    RetrievalConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(RetrievalConfig::from_file(&path).unwrap().page_size, 7);
}

#[test]
fn test_file_settings_reach_requests() {
    let (_dir, path) = config_file(
        r#"
page_size = 3
strategy = "search_after"
tie_breaker_field = "_id"
"#,
    );
    let config = RetrievalConfig::from_file(&path).unwrap();
    let client = library();
    let session = SearchSession::new(client.clone(), runtime().handle().clone(), config).unwrap();

    let ids: Vec<String> = session
        .sequence(SearchRequest::new(INDEX).with_sort(SortField::asc("year")))
        .unwrap()
        .map(|m| m.unwrap().id)
        .collect();
    assert_eq!(ids.len(), 12);

    let calls = client.calls();
    assert_eq!(calls.len(), 5);
    for call in calls {
        match call {
            ClientCall::Search(r) => {
                assert_eq!(r.size, 3);
                assert_eq!(r.sort, vec![SortField::asc("year"), SortField::asc("_id")]);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
}

#[test]
fn test_invalid_files_are_rejected() {
    let (_dir, path) = config_file("page_size = 0\n");
    assert!(matches!(RetrievalConfig::from_file(&path), Err(Error::Config(_))));

    let (_dir, path) = config_file("page_size = \"ten\"\n");
    assert!(matches!(RetrievalConfig::from_file(&path), Err(Error::Config(_))));

    let (_dir, path) = config_file("strategy = \"random\"\n");
    assert!(matches!(RetrievalConfig::from_file(&path), Err(Error::Config(_))));

    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(RetrievalConfig::from_file(&missing), Err(Error::Config(_))));
}

#[test]
fn test_remote_section_builds_client() {
    let (_dir, path) = config_file(
        r#"
strategy = "offset"

[remote]
endpoint = "http://search.local:9200/"
api_key = "abc"
timeout_ms = 5000
"#,
    );
    let config = RetrievalConfig::from_file(&path).unwrap();
    let remote = config.remote.as_ref().unwrap();
    assert_eq!(remote.timeout(), Duration::from_secs(5));

    let client = ElasticClient::from_config(remote);
    assert_eq!(client.endpoint(), "http://search.local:9200");
}

#[test]
fn test_written_config_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(sift::CONFIG_FILE_NAME);
    let config = RetrievalConfig::default()
        .with_page_size(50)
        .with_keep_alive(Duration::from_secs(120))
        .with_strategy(Strategy::SearchAfter)
        .with_remote(RemoteConfig::new("http://localhost:9200"));

    config.write_to_file(&path).unwrap();
    assert_eq!(RetrievalConfig::from_file(&path).unwrap(), config);
}
