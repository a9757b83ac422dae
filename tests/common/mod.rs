//! Shared fixtures for the integration suites.
//!
//! Import with `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::json;
use sift::{MemoryClient, RetrievalConfig, SearchSession, Strategy};
use tempfile::TempDir;
use tokio::runtime::Runtime;

pub const INDEX: &str = "library";

/// Runtime shared by every test in a suite
pub fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime")
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub year: u32,
}

impl Book {
    pub fn new(title: &str, author: &str, year: u32) -> Self {
        Book {
            title: title.into(),
            author: author.into(),
            year,
        }
    }
}

/// Twelve books in insertion order; several share a publication year.
pub fn books() -> Vec<(String, Book)> {
    [
        ("b01", "Dune", "herbert", 1965),
        ("b02", "Neuromancer", "gibson", 1984),
        ("b03", "Hyperion", "simmons", 1989),
        ("b04", "Foundation", "asimov", 1951),
        ("b05", "Count Zero", "gibson", 1986),
        ("b06", "Solaris", "lem", 1961),
        ("b07", "Ubik", "dick", 1969),
        ("b08", "The Left Hand of Darkness", "le guin", 1969),
        ("b09", "Mona Lisa Overdrive", "gibson", 1988),
        ("b10", "Stand on Zanzibar", "brunner", 1968),
        ("b11", "Nova", "delany", 1968),
        ("b12", "Dhalgren", "delany", 1975),
    ]
    .into_iter()
    .map(|(id, title, author, year)| (id.to_string(), Book::new(title, author, year)))
    .collect()
}

/// In-memory index holding [`books`]
pub fn library() -> Arc<MemoryClient> {
    let client = MemoryClient::new();
    for (id, book) in books() {
        client.insert(id, json!(book));
    }
    Arc::new(client)
}

pub fn session(client: &Arc<MemoryClient>, page_size: usize, strategy: Strategy) -> SearchSession {
    let config = RetrievalConfig::default()
        .with_page_size(page_size)
        .with_strategy(strategy);
    SearchSession::new(client.clone(), runtime().handle().clone(), config).expect("session")
}

/// Temporary directory holding a config file with `content`
pub fn config_file(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(sift::CONFIG_FILE_NAME);
    std::fs::write(&path, content).expect("write config");
    (dir, path)
}
